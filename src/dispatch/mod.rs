//! Dispatchers bind mailboxes to execution resources.
//!
//! A dispatcher decides what "drain this mailbox" means: run it inline on
//! the calling thread ([`CallerThreadDispatcher`]), queue it onto a private
//! worker ([`PooledDispatcher`]), or drop it ([`NullDispatcher`]). One
//! dispatcher instance is shared by many mailboxes and holds no per-mailbox
//! state beyond the throughput cap.

mod caller_thread;
mod null;
mod pooled;

pub use caller_thread::CallerThreadDispatcher;
pub use null::NullDispatcher;
pub use pooled::PooledDispatcher;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::actor::ActorCell;
use crate::envelope::Envelope;
use crate::error::SchedulerError;
use crate::mailbox::Mailbox;

pub trait Dispatcher: fmt::Debug + Send + Sync {
    /// Maximum user envelopes drained per scheduling turn.
    fn throughput(&self) -> usize;

    /// Executes one drain of `mailbox`, inline or by submitting it to this
    /// dispatcher's execution resource. Called only by the winner of the
    /// mailbox's `Open → Scheduled` CAS.
    fn execute(&self, mailbox: Arc<Mailbox>);

    /// Stops accepting work and releases the execution resource. Idempotent;
    /// the default is a no-op for dispatchers that own no threads.
    fn dispose(&self, _timeout: Option<Duration>) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        false
    }

    /// Schedules a drain iff the mailbox has pending messages and is not
    /// already scheduled (check-then-schedule, applied uniformly).
    ///
    /// Returns `false` when there is nothing to do or another thread
    /// already owns the drain. This is the single synchronization point that
    /// prevents concurrent drains of one mailbox.
    fn try_execute_mailbox(&self, mailbox: &Arc<Mailbox>) -> bool {
        if !mailbox.has_messages() {
            return false;
        }
        if mailbox.try_set_scheduled() {
            self.execute(Arc::clone(mailbox));
            true
        } else {
            false
        }
    }

    /// Enqueues `envelope` into the actor's mailbox and schedules a drain.
    ///
    /// An envelope for a closed mailbox or a disposed dispatcher is
    /// silently dropped: a stopped actor must not resurrect, and producers
    /// need not branch on it. The disposal check runs before the enqueue so
    /// nothing accumulates in a mailbox no drain will ever visit.
    fn dispatch(&self, cell: &ActorCell, envelope: Envelope) {
        if self.is_disposed() {
            trace!(path = cell.path(), "dropping envelope for disposed dispatcher");
            return;
        }
        if !cell.mailbox().try_add(envelope) {
            trace!(path = cell.path(), "dropping envelope for closed mailbox");
            return;
        }
        self.try_execute_mailbox(cell.mailbox());
    }
}

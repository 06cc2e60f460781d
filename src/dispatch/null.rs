use std::sync::Arc;

use tracing::trace;

use crate::actor::ActorCell;
use crate::dispatch::Dispatcher;
use crate::envelope::Envelope;
use crate::mailbox::Mailbox;

/// No-op sentinel dispatcher.
///
/// Drops every envelope and never schedules a drain. Stands in where real
/// wiring does not exist yet, so components can hold a `Arc<dyn Dispatcher>`
/// unconditionally instead of an `Option`. Pairs naturally with
/// [`Mailbox::null`].
#[derive(Debug, Default)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn throughput(&self) -> usize {
        0
    }

    fn execute(&self, mailbox: Arc<Mailbox>) {
        // Nothing will ever drain this mailbox; do not leave it Scheduled.
        mailbox.try_back_to_open();
    }

    fn try_execute_mailbox(&self, _mailbox: &Arc<Mailbox>) -> bool {
        false
    }

    fn dispatch(&self, cell: &ActorCell, _envelope: Envelope) {
        trace!(path = cell.path(), "null dispatcher dropping envelope");
    }
}

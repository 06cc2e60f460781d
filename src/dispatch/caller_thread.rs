use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::mailbox::Mailbox;

/// Executes drains synchronously on the calling thread.
///
/// Throughput is unbounded, so a drain runs to empty. Useful for
/// deterministic single-threaded testing and for actors whose handlers are
/// cheap enough to run on the producer's thread.
#[derive(Debug, Default)]
pub struct CallerThreadDispatcher;

impl Dispatcher for CallerThreadDispatcher {
    fn throughput(&self) -> usize {
        usize::MAX
    }

    fn execute(&self, mailbox: Arc<Mailbox>) {
        mailbox.process();
    }
}

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{DispatcherConfig, SchedulerConfig};
use crate::dispatch::Dispatcher;
use crate::error::SchedulerError;
use crate::mailbox::Mailbox;
use crate::scheduler::TaskScheduler;
use crate::thread_factory::ThreadFactory;

/// Submits drains to a private single-worker [`TaskScheduler`].
///
/// The scheduler (and its one dedicated thread) is created with the
/// dispatcher and disposed with it; disposal blocks until the worker has
/// drained and exited, or until the timeout elapses. Once disposal begins,
/// new drains are refused by the scheduler's closed flag.
#[derive(Debug)]
pub struct PooledDispatcher {
    scheduler: Arc<TaskScheduler>,
    throughput: usize,
}

impl PooledDispatcher {
    /// Creates the dispatcher and its worker thread. `name` seeds the
    /// worker's thread name.
    pub fn new(name: &str, config: DispatcherConfig) -> Result<Self, SchedulerError> {
        let factory = ThreadFactory::new(format!("{name}-dispatcher")).background(true);
        let scheduler = TaskScheduler::new(SchedulerConfig::single_worker(factory))?;
        debug!(name, throughput = config.throughput_per_actor, "pooled dispatcher started");
        Ok(Self {
            scheduler: Arc::new(scheduler),
            throughput: config.throughput_per_actor.max(1),
        })
    }
}

impl Dispatcher for PooledDispatcher {
    fn throughput(&self) -> usize {
        self.throughput
    }

    fn execute(&self, mailbox: Arc<Mailbox>) {
        let drain_target = Arc::clone(&mailbox);
        let submitted = self
            .scheduler
            .submit(Box::new(move || drain_target.process()));
        if submitted.is_err() {
            // Disposal raced the schedule; reopen so the state machine is
            // not wedged in Scheduled.
            mailbox.try_back_to_open();
        }
    }

    fn dispose(&self, timeout: Option<Duration>) -> Result<(), SchedulerError> {
        self.scheduler.dispose(timeout)
    }

    fn is_disposed(&self) -> bool {
        self.scheduler.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorCell;
    use crate::envelope::Envelope;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn wait_until(deadline: Duration, condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn processes_on_the_pool_thread() {
        let dispatcher = Arc::new(
            PooledDispatcher::new("pool-test", DispatcherConfig::default()).unwrap(),
        );
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let cell = ActorCell::new("pooled-actor", dispatcher.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..50 {
            cell.send(Envelope::new(Box::new(())));
        }
        assert!(wait_until(Duration::from_secs(5), || {
            invocations.load(Ordering::SeqCst) == 50
        }));
        dispatcher.dispose(None).unwrap();
    }

    #[test]
    fn dispatch_after_dispose_drops_envelopes() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let dispatcher = Arc::new(
            PooledDispatcher::new("post-dispose", DispatcherConfig::default()).unwrap(),
        );
        let cell = ActorCell::new("post-dispose-actor", dispatcher.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let actor = cell.actor_ref();
        dispatcher.dispose(None).unwrap();

        for _ in 0..1000 {
            actor.tell(Box::new(()));
        }

        // Dropped before the enqueue: nothing retained, nothing invoked.
        assert_eq!(cell.mailbox().user_len(), 0);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert!(!cell.mailbox().is_closed());
    }

    #[test]
    fn execute_after_dispose_reopens_the_mailbox() {
        let dispatcher =
            PooledDispatcher::new("disposed-test", DispatcherConfig::default()).unwrap();
        dispatcher.dispose(None).unwrap();
        assert!(dispatcher.is_disposed());

        let mailbox = Mailbox::new();
        assert!(mailbox.try_set_scheduled());
        dispatcher.execute(Arc::clone(&mailbox));
        assert_eq!(mailbox.status(), crate::mailbox::MailboxStatus::Open);
    }

    #[test]
    fn dispose_is_idempotent() {
        let dispatcher =
            PooledDispatcher::new("idempotent-test", DispatcherConfig::default()).unwrap();
        dispatcher.dispose(None).unwrap();
        dispatcher.dispose(None).unwrap();
    }
}

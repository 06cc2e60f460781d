//! Fixed-thread task scheduler.
//!
//! A [`TaskScheduler`] owns an exact number of worker threads and one shared
//! blocking work queue. Workers loop: block until a task is available, run
//! it, repeat, until the queue is closed and drained. The unit of work is an
//! opaque `FnOnce`: dispatchers submit "drain this mailbox" closures, but
//! the scheduler knows nothing about mailboxes.
//!
//! Disposal closes the queue first, so tasks already queued at disposal time
//! run to completion before workers exit. A timed-out join leaves the
//! remaining workers running in the background; that is a best-effort
//! limitation, not a kill.

pub mod group;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::config::{SchedulerConfig, Topology};
use crate::error::{SchedulerError, panic_message};

/// An opaque unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Completion handle for one submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    done: flume::Receiver<()>,
}

impl TaskHandle {
    /// Blocks until the task has run. Returns `false` if the task panicked
    /// or was dropped unexecuted.
    pub fn wait(&self) -> bool {
        self.done.recv().is_ok()
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.done.recv_timeout(timeout).is_ok()
    }
}

enum WorkMessage {
    Run { task: Task, done: flume::Sender<()> },
    Terminate,
}

/// Fixed pool of worker threads draining one shared blocking queue.
pub struct TaskScheduler {
    concurrency: usize,
    topology: Topology,
    sender: flume::Sender<WorkMessage>,
    disposed: AtomicBool,
    // Orders submit's check-and-send against dispose's flag-and-terminate,
    // so an accepted task is always queued ahead of every Terminate.
    submit_gate: Mutex<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    exited: flume::Receiver<()>,
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("concurrency", &self.concurrency)
            .field("topology", &self.topology)
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .field("queued", &self.sender.len())
            .finish()
    }
}

impl TaskScheduler {
    /// Spawns exactly `config.concurrency()` workers through the configured
    /// thread factory and starts them on the shared queue.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let (concurrency, topology, factory) = config.into_factory();
        let (sender, receiver) = flume::unbounded::<WorkMessage>();
        let (exit_tx, exited) = flume::unbounded::<()>();

        let mut workers = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            let receiver = receiver.clone();
            let exit_tx = exit_tx.clone();
            let handle = factory.create(move || {
                Self::worker_loop(&receiver);
                let _ = exit_tx.send(());
            })?;
            workers.push(handle);
        }
        debug!(concurrency, ?topology, "task scheduler started");

        Ok(Self {
            concurrency,
            topology,
            sender,
            disposed: AtomicBool::new(false),
            submit_gate: Mutex::new(()),
            workers: Mutex::new(workers),
            exited,
        })
    }

    fn worker_loop(receiver: &flume::Receiver<WorkMessage>) {
        while let Ok(message) = receiver.recv() {
            match message {
                WorkMessage::Run { task, done } => {
                    match panic::catch_unwind(AssertUnwindSafe(task)) {
                        Ok(()) => {
                            let _ = done.send(());
                        }
                        Err(payload) => {
                            // The completion sender drops unsent, so waiters
                            // observe the failure.
                            error!(panic = %panic_message(payload), "task panicked");
                        }
                    }
                }
                WorkMessage::Terminate => break,
            }
        }
    }

    /// Queues a task for execution. Never blocks on the queue; an `Ok`
    /// return guarantees the task will run before the workers exit.
    pub fn submit(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
        let _gate = self.submit_gate.lock().expect("submit gate poisoned");
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SchedulerError::Disposed);
        }
        let (done_tx, done_rx) = flume::bounded(1);
        self.sender
            .send(WorkMessage::Run { task, done: done_tx })
            .map_err(|_| SchedulerError::Disposed)?;
        Ok(TaskHandle { done: done_rx })
    }

    /// Submits a task and returns its handle; alias kept for callers that
    /// think in terms of starting work rather than queueing it.
    pub fn start(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
        self.submit(task)
    }

    pub fn concurrency_level(&self) -> usize {
        self.concurrency
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Closes the queue and joins the workers.
    ///
    /// The first call wins; later calls are no-ops returning `Ok(())`.
    /// Tasks queued before disposal run to completion. With a timeout,
    /// workers still running at the deadline are left behind and reported
    /// via [`SchedulerError::JoinTimeout`]. After such a timeout a repeat
    /// call also returns `Ok(())` immediately without joining the
    /// stragglers, so `Ok` from a later call does not mean every worker
    /// has exited.
    pub fn dispose(&self, timeout: Option<Duration>) -> Result<(), SchedulerError> {
        {
            let _gate = self.submit_gate.lock().expect("submit gate poisoned");
            if self.disposed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            // One terminator per worker, sent under the gate so no accepted
            // task can land behind them; existing tasks drain first.
            for _ in 0..self.concurrency {
                let _ = self.sender.send(WorkMessage::Terminate);
            }
        }
        debug!(concurrency = self.concurrency, "disposing task scheduler");

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut exited = 0;
        while exited < self.concurrency {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    let remaining_time = deadline.saturating_duration_since(now);
                    if remaining_time.is_zero()
                        || self.exited.recv_timeout(remaining_time).is_err()
                    {
                        let remaining = self.concurrency - exited;
                        warn!(remaining, "worker join timed out; leaving workers running");
                        return Err(SchedulerError::JoinTimeout {
                            timeout: timeout.unwrap_or_default(),
                            remaining,
                        });
                    }
                    exited += 1;
                }
                None => {
                    if self.exited.recv().is_err() {
                        break;
                    }
                    exited += 1;
                }
            }
        }

        // All workers have signalled; the joins below are immediate.
        let mut workers = self.workers.lock().expect("worker list poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // Release blocked workers without joining; an explicit dispose()
        // is the orderly path.
        if !self.disposed.swap(true, Ordering::SeqCst) {
            for _ in 0..self.concurrency {
                let _ = self.sender.send(WorkMessage::Terminate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread_factory::ThreadFactory;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn scheduler(concurrency: usize) -> TaskScheduler {
        let config = SchedulerConfig::new(
            concurrency,
            if concurrency > 1 { Topology::WorkStealing } else { Topology::Single },
            ThreadFactory::new("sched-test"),
        )
        .unwrap();
        TaskScheduler::new(config).unwrap()
    }

    #[test]
    fn runs_submitted_tasks() {
        let scheduler = scheduler(2);
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let counter = Arc::clone(&counter);
                scheduler
                    .submit(Box::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }))
                    .unwrap()
            })
            .collect();
        for handle in &handles {
            assert!(handle.wait_timeout(Duration::from_secs(5)));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        scheduler.dispose(None).unwrap();
    }

    #[test]
    fn task_panic_does_not_kill_the_worker() {
        let scheduler = scheduler(1);
        let bad = scheduler.submit(Box::new(|| panic!("exploding task"))).unwrap();
        assert!(!bad.wait_timeout(Duration::from_secs(5)));

        // The same single worker must still run the next task.
        let good = scheduler.submit(Box::new(|| {})).unwrap();
        assert!(good.wait_timeout(Duration::from_secs(5)));
        scheduler.dispose(None).unwrap();
    }

    #[test]
    fn dispose_is_idempotent_and_rejects_new_tasks() {
        let scheduler = scheduler(2);
        scheduler.dispose(None).unwrap();
        scheduler.dispose(None).unwrap();
        assert!(scheduler.is_disposed());
        assert!(matches!(
            scheduler.submit(Box::new(|| {})),
            Err(SchedulerError::Disposed)
        ));
    }

    #[test]
    fn dispose_completes_queued_tasks_first() {
        let scheduler = scheduler(1);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            scheduler
                .submit(Box::new(move || {
                    thread::sleep(Duration::from_millis(5));
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        scheduler.dispose(None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn dispose_join_can_time_out() {
        let scheduler = scheduler(1);
        scheduler
            .submit(Box::new(|| thread::sleep(Duration::from_millis(500))))
            .unwrap();
        let result = scheduler.dispose(Some(Duration::from_millis(50)));
        assert!(matches!(
            result,
            Err(SchedulerError::JoinTimeout { remaining: 1, .. })
        ));
        // A repeat call is a no-op Ok even though the straggler is still
        // running; it does not join.
        scheduler.dispose(None).unwrap();
    }

    #[test]
    fn tasks_accepted_during_dispose_all_run() {
        let scheduler = Arc::new(scheduler(2));

        // Hammer submit from several threads while the main thread
        // disposes; any submit that returned Ok must still complete.
        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    let mut accepted = Vec::new();
                    for _ in 0..50_000 {
                        match scheduler.submit(Box::new(|| {})) {
                            Ok(handle) => accepted.push(handle),
                            Err(_) => break,
                        }
                    }
                    accepted
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(5));
        scheduler.dispose(None).unwrap();

        for submitter in submitters {
            for handle in submitter.join().unwrap() {
                assert!(handle.wait_timeout(Duration::from_secs(5)));
            }
        }
    }
}

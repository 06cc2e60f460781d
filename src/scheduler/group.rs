//! Scheduler fan-out.
//!
//! A [`SchedulerGroup`] owns one or more [`TaskScheduler`]s and decides
//! which one receives the next piece of work: always the same one (single
//! topology) or round-robin over an array of single-worker schedulers
//! (multi topology). Selection is an atomic cursor, not work-aware; it
//! does not look at queue depth.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::scheduler::{Task, TaskHandle, TaskScheduler};
use crate::thread_factory::ThreadFactory;

#[derive(Debug)]
enum GroupKind {
    Single(Arc<TaskScheduler>),
    RoundRobin {
        schedulers: Vec<Arc<TaskScheduler>>,
        cursor: AtomicUsize,
    },
}

#[derive(Debug)]
pub struct SchedulerGroup {
    kind: GroupKind,
}

impl SchedulerGroup {
    /// Group backed by exactly one scheduler.
    pub fn single(scheduler: Arc<TaskScheduler>) -> Self {
        Self { kind: GroupKind::Single(scheduler) }
    }

    /// Round-robin group over the given schedulers.
    pub fn round_robin(schedulers: Vec<Arc<TaskScheduler>>) -> Result<Self, SchedulerError> {
        if schedulers.is_empty() {
            return Err(SchedulerError::EmptyGroup);
        }
        Self::validate_members(&schedulers)?;
        Ok(Self {
            kind: GroupKind::RoundRobin { schedulers, cursor: AtomicUsize::new(0) },
        })
    }

    /// Builds a round-robin group of `count` single-worker schedulers whose
    /// workers are named `"<name_prefix>-<i>-<n>"`.
    pub fn multi(count: usize, name_prefix: &str) -> Result<Self, SchedulerError> {
        if count == 0 {
            return Err(SchedulerError::EmptyGroup);
        }
        let mut schedulers = Vec::with_capacity(count);
        for index in 0..count {
            let factory = ThreadFactory::new(format!("{name_prefix}-{index}"));
            let config = SchedulerConfig::single_worker(factory);
            schedulers.push(Arc::new(TaskScheduler::new(config)?));
        }
        Self::round_robin(schedulers)
    }

    fn validate_members(schedulers: &[Arc<TaskScheduler>]) -> Result<(), SchedulerError> {
        for scheduler in schedulers {
            if scheduler.concurrency_level() != 1 {
                return Err(SchedulerError::InvalidConcurrency {
                    parameter: "schedulers",
                    value: scheduler.concurrency_level(),
                    reason: "round-robin group members must be single-worker schedulers",
                });
            }
        }
        Ok(())
    }

    /// Picks the scheduler for the next piece of work.
    pub fn next_scheduler(&self) -> &Arc<TaskScheduler> {
        match &self.kind {
            GroupKind::Single(scheduler) => scheduler,
            GroupKind::RoundRobin { schedulers, cursor } => {
                let index = cursor.fetch_add(1, Ordering::SeqCst) % schedulers.len();
                &schedulers[index]
            }
        }
    }

    /// Binds `task` to the chosen scheduler and starts it.
    pub fn start_on_next_scheduler(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
        self.next_scheduler().start(task)
    }

    /// Number of member schedulers.
    pub fn len(&self) -> usize {
        match &self.kind {
            GroupKind::Single(_) => 1,
            GroupKind::RoundRobin { schedulers, .. } => schedulers.len(),
        }
    }

    /// Always false; both constructors reject an empty member set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disposes every member; the first failure is reported after all
    /// members have been asked to stop.
    pub fn dispose(&self, timeout: Option<Duration>) -> Result<(), SchedulerError> {
        let mut first_error = None;
        let members: Vec<&Arc<TaskScheduler>> = match &self.kind {
            GroupKind::Single(scheduler) => vec![scheduler],
            GroupKind::RoundRobin { schedulers, .. } => schedulers.iter().collect(),
        };
        for scheduler in members {
            if let Err(err) = scheduler.dispose(timeout) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

//! Validated construction parameters for schedulers and dispatchers.

use crate::error::SchedulerError;
use crate::thread_factory::ThreadFactory;

/// User envelopes processed per drain turn when not otherwise configured.
pub const DEFAULT_THROUGHPUT_PER_ACTOR: usize = 10;

/// How a scheduler's workers relate to its work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One set of workers draining one FIFO queue.
    Single,
    /// Two or more workers competing for work from one shared bag.
    WorkStealing,
}

/// Validated configuration for a [`TaskScheduler`](crate::scheduler::TaskScheduler).
///
/// There is no fluent builder: construct through [`SchedulerConfig::new`],
/// which applies defaults and rejects inconsistent combinations up front.
#[derive(Debug)]
pub struct SchedulerConfig {
    concurrency: usize,
    topology: Topology,
    factory: ThreadFactory,
}

impl SchedulerConfig {
    /// Builds a configuration.
    ///
    /// A `concurrency` of 0 falls back to the logical CPU count (the one
    /// documented or-default policy). `Topology::WorkStealing` with a single
    /// worker is rejected: work-stealing implies at least two competing
    /// consumers.
    pub fn new(
        concurrency: usize,
        topology: Topology,
        factory: ThreadFactory,
    ) -> Result<Self, SchedulerError> {
        let concurrency = if concurrency == 0 { num_cpus::get() } else { concurrency };
        if topology == Topology::WorkStealing && concurrency < 2 {
            return Err(SchedulerError::InvalidConcurrency {
                parameter: "concurrency",
                value: concurrency,
                reason: "work-stealing topology requires at least two workers",
            });
        }
        Ok(Self { concurrency, topology, factory })
    }

    /// Single worker draining a FIFO queue; cannot fail validation.
    pub fn single_worker(factory: ThreadFactory) -> Self {
        Self { concurrency: 1, topology: Topology::Single, factory }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub(crate) fn into_factory(self) -> (usize, Topology, ThreadFactory) {
        (self.concurrency, self.topology, self.factory)
    }
}

/// Per-dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum user envelopes drained per scheduling turn. Values below 1
    /// are clamped to 1; system messages are never subject to this cap.
    pub throughput_per_actor: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { throughput_per_actor: DEFAULT_THROUGHPUT_PER_ACTOR }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_falls_back_to_cpu_count() {
        let config =
            SchedulerConfig::new(0, Topology::Single, ThreadFactory::new("cfg")).unwrap();
        assert_eq!(config.concurrency(), num_cpus::get());
    }

    #[test]
    fn work_stealing_requires_two_workers() {
        let err = SchedulerConfig::new(1, Topology::WorkStealing, ThreadFactory::new("cfg"))
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidConcurrency { parameter: "concurrency", value: 1, .. }
        ));
    }

    #[test]
    fn work_stealing_accepts_two_workers() {
        let config =
            SchedulerConfig::new(2, Topology::WorkStealing, ThreadFactory::new("cfg")).unwrap();
        assert_eq!(config.topology(), Topology::WorkStealing);
    }
}

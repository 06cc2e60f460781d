//! Worker thread creation.
//!
//! Schedulers never call `std::thread::spawn` directly; they go through a
//! [`ThreadFactory`] so that every worker carries a recognizable name
//! (`"<prefix>-<n>"`) and the factory's priority/background tags. The
//! factory is an injectable dependency: embedding applications can
//! construct one per pool with their own naming scheme.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::SchedulerError;

/// Advisory worker priority tag.
///
/// `std::thread` exposes no portable priority API, so the tag is recorded
/// and logged at spawn but not applied to the OS thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Creates named, sequence-numbered worker threads.
#[derive(Debug)]
pub struct ThreadFactory {
    name_prefix: String,
    priority: ThreadPriority,
    background: bool,
    counter: AtomicUsize,
}

impl ThreadFactory {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            priority: ThreadPriority::Normal,
            background: false,
            counter: AtomicUsize::new(1),
        }
    }

    pub fn priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Background workers may be abandoned by a timed-out disposal join
    /// instead of blocking shutdown indefinitely.
    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Spawns a named worker running `entry_point`.
    pub fn create(
        &self,
        entry_point: impl FnOnce() + Send + 'static,
    ) -> Result<JoinHandle<()>, SchedulerError> {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}-{}", self.name_prefix, sequence);
        debug!(
            thread = %name,
            priority = ?self.priority,
            background = self.background,
            "spawning worker thread"
        );
        thread::Builder::new()
            .name(name)
            .spawn(entry_point)
            .map_err(SchedulerError::SpawnFailed)
    }
}

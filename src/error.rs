use std::any::Any;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by schedulers, scheduler groups, and dispatchers.
///
/// Runtime rejections that are expected in normal operation (enqueue onto a
/// closed mailbox, dispatch after disposal) are deliberately *not* errors:
/// they are reported as `false` or a silent drop, since a stopped actor must
/// not be resurrected and producers should not need to branch on it.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid value {value} for `{parameter}`: {reason}")]
    InvalidConcurrency {
        parameter: &'static str,
        value: usize,
        reason: &'static str,
    },
    #[error("scheduler group requires at least one scheduler")]
    EmptyGroup,
    #[error("scheduler is disposed and no longer accepts tasks")]
    Disposed,
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] io::Error),
    #[error("timed out after {timeout:?} waiting for {remaining} worker(s) to exit")]
    JoinTimeout { timeout: Duration, remaining: usize },
    #[error("internal scheduler error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Extracts a readable message from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(s) => (*s).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

//! magpie: a thread-based actor scheduling core.
//!
//! Each actor owns a private mailbox drained strictly in arrival order by
//! at most one worker thread at a time, without a per-message lock. A
//! pluggable [`Dispatcher`](dispatch::Dispatcher) decides how a drain
//! executes, inline on the calling thread or queued onto a fixed-thread
//! [`TaskScheduler`](scheduler::TaskScheduler), and a
//! [`SchedulerGroup`](scheduler::group::SchedulerGroup) fans work out
//! across schedulers. Mailboxes are unbounded by design; back-pressure to
//! producers is out of scope.

pub mod actor;
pub mod atomic;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod mailbox;
pub mod scheduler;
pub mod thread_factory;

// Re-export the types most embeddings touch.
pub use actor::{ActorCell, ActorRef, MessageInvoker};
pub use config::{DEFAULT_THROUGHPUT_PER_ACTOR, DispatcherConfig, SchedulerConfig, Topology};
pub use dispatch::{CallerThreadDispatcher, Dispatcher, NullDispatcher, PooledDispatcher};
pub use envelope::{BoxedMessage, Envelope, SystemMessage};
pub use error::SchedulerError;
pub use mailbox::{Mailbox, MailboxStatus};
pub use scheduler::group::SchedulerGroup;
pub use scheduler::{Task, TaskHandle, TaskScheduler};
pub use thread_factory::{ThreadFactory, ThreadPriority};

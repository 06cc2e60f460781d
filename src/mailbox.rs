//! Mailbox: ordered concurrent queues plus a scheduling state machine.
//!
//! A mailbox owns two unbounded FIFO queues (system messages and user
//! envelopes) and a single atomic status word:
//!
//! ```text
//! Open ──try_set_scheduled──▶ Scheduled ──try_back_to_open──▶ Open …
//!   │                             │
//!   └────────── close ────────────┴──▶ Closed (terminal)
//! ```
//!
//! The `Open → Scheduled` CAS is the only synchronization point guarding a
//! drain: whoever wins it owns the mailbox until `try_back_to_open`. There
//! is no per-message lock and enqueue never blocks.

use std::sync::{Arc, OnceLock, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_queue::SegQueue;
use tracing::warn;

use crate::actor::MessageInvoker;
use crate::dispatch::Dispatcher;
use crate::envelope::{Envelope, SystemMessage};

/// Scheduling state of a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MailboxStatus {
    /// Idle; no drain in progress.
    Open = 0,
    /// A drain owns this mailbox.
    Scheduled = 1,
    /// Terminal; rejects all further work.
    Closed = 2,
}

/// One actor's message queue and scheduling flag.
///
/// The owning invoker and dispatcher are wired once, after construction,
/// because the actor cell that implements [`MessageInvoker`] needs the
/// mailbox to exist first.
pub struct Mailbox {
    status: AtomicU32,
    system_queue: SegQueue<SystemMessage>,
    user_queue: SegQueue<Envelope>,
    invoker: OnceLock<Weak<dyn MessageInvoker>>,
    dispatcher: OnceLock<Arc<dyn Dispatcher>>,
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("status", &self.status())
            .field("system_pending", &self.system_queue.len())
            .field("user_pending", &self.user_queue.len())
            .finish()
    }
}

impl Mailbox {
    /// Creates an open, empty mailbox.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            status: AtomicU32::new(MailboxStatus::Open as u32),
            system_queue: SegQueue::new(),
            user_queue: SegQueue::new(),
            invoker: OnceLock::new(),
            dispatcher: OnceLock::new(),
        })
    }

    /// Sentinel mailbox that is closed from birth: every enqueue fails and
    /// draining is a no-op. Safe default before real wiring exists.
    pub fn null() -> Arc<Self> {
        let mailbox = Self::new();
        mailbox.close();
        mailbox
    }

    /// Wires the owning invoker and dispatcher. Later calls are ignored
    /// with a warning; a mailbox belongs to one actor for its lifetime.
    pub fn register(&self, invoker: Weak<dyn MessageInvoker>, dispatcher: Arc<dyn Dispatcher>) {
        if self.invoker.set(invoker).is_err() || self.dispatcher.set(dispatcher).is_err() {
            warn!("mailbox already registered; ignoring re-registration");
        }
    }

    pub fn status(&self) -> MailboxStatus {
        match self.status.load(Ordering::SeqCst) {
            0 => MailboxStatus::Open,
            1 => MailboxStatus::Scheduled,
            _ => MailboxStatus::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.load(Ordering::SeqCst) == MailboxStatus::Closed as u32
    }

    /// True when either queue has a pending message.
    pub fn has_messages(&self) -> bool {
        !self.system_queue.is_empty() || !self.user_queue.is_empty()
    }

    /// Pending user envelopes (snapshot).
    pub fn user_len(&self) -> usize {
        self.user_queue.len()
    }

    /// CAS `Open → Scheduled`. Fails silently when already scheduled or
    /// closed; the winner owns the next drain.
    pub fn try_set_scheduled(&self) -> bool {
        self.status
            .compare_exchange(
                MailboxStatus::Open as u32,
                MailboxStatus::Scheduled as u32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// CAS `Scheduled → Open` at the end of a drain. Fails when the mailbox
    /// was closed concurrently.
    pub fn try_back_to_open(&self) -> bool {
        self.status
            .compare_exchange(
                MailboxStatus::Scheduled as u32,
                MailboxStatus::Open as u32,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Irreversibly closes the mailbox.
    pub fn close(&self) {
        self.status.store(MailboxStatus::Closed as u32, Ordering::SeqCst);
    }

    /// Enqueues a user envelope. Returns `false` when closed. Never blocks.
    pub fn try_add(&self, envelope: Envelope) -> bool {
        if self.is_closed() {
            return false;
        }
        self.user_queue.push(envelope);
        true
    }

    /// Enqueues a system message. Returns `false` when closed. Never blocks.
    pub fn try_add_system(&self, message: SystemMessage) -> bool {
        if self.is_closed() {
            return false;
        }
        self.system_queue.push(message);
        true
    }

    /// One drain turn.
    ///
    /// Pending system messages always drain to empty first and again before
    /// every user envelope, so a system message arriving mid-drain is
    /// honored before the next user envelope. User envelopes are capped at
    /// the dispatcher's throughput. Afterwards the mailbox reopens and the
    /// dispatcher re-checks for work that arrived during the drain, so no
    /// message is stranded in an Open mailbox with nobody scheduled.
    ///
    /// Handler panics are not caught here; fault isolation is the invoker's
    /// contract.
    pub fn process(self: &Arc<Self>) {
        if self.is_closed() {
            return;
        }
        let Some(dispatcher) = self.dispatcher.get() else {
            self.try_back_to_open();
            return;
        };
        let Some(invoker) = self.invoker.get().and_then(Weak::upgrade) else {
            self.try_back_to_open();
            return;
        };

        let throughput = dispatcher.throughput();
        let mut processed = 0;
        loop {
            while let Some(message) = self.system_queue.pop() {
                invoker.invoke_system(message);
                if self.is_closed() {
                    return;
                }
            }
            if processed >= throughput {
                break;
            }
            match self.user_queue.pop() {
                Some(envelope) => {
                    invoker.invoke_user(envelope);
                    processed += 1;
                    if self.is_closed() {
                        return;
                    }
                }
                None => break,
            }
        }

        if self.try_back_to_open() {
            dispatcher.try_execute_mailbox(self);
        }
    }
}

//! Actor cell and references.
//!
//! The [`ActorCell`] is the addressable owner of a mailbox and a dispatcher
//! reference. It is where handler-level fault isolation lives: the mailbox
//! promises ordering and single-drainer-at-a-time, the cell catches handler
//! panics, logs them, and keeps going.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, error};

use crate::dispatch::Dispatcher;
use crate::envelope::{BoxedMessage, Envelope, SystemMessage};
use crate::error::panic_message;
use crate::mailbox::Mailbox;

/// Consumes messages during a mailbox drain.
///
/// Implemented by [`ActorCell`]; tests implement it directly to observe
/// drain behavior.
pub trait MessageInvoker: Send + Sync {
    fn invoke_user(&self, envelope: Envelope);
    fn invoke_system(&self, message: SystemMessage);
}

type UserHandler = dyn Fn(Envelope) + Send + Sync;
type SystemHook = dyn Fn(&SystemMessage) + Send + Sync;

/// The runtime owner of one mailbox, one dispatcher reference, and the
/// message-handling logic.
pub struct ActorCell {
    path: String,
    mailbox: Arc<Mailbox>,
    dispatcher: Arc<dyn Dispatcher>,
    handler: Box<UserHandler>,
    system_hook: Option<Box<SystemHook>>,
}

impl std::fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorCell")
            .field("path", &self.path)
            .field("mailbox", &self.mailbox)
            .finish()
    }
}

impl ActorCell {
    /// Creates a cell, wires mailbox ↔ invoker ↔ dispatcher, and enqueues
    /// [`SystemMessage::Start`].
    pub fn new(
        path: impl Into<String>,
        dispatcher: Arc<dyn Dispatcher>,
        handler: impl Fn(Envelope) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_system_hook(path, dispatcher, handler, None)
    }

    /// Like [`new`](Self::new) with a hook observing every system message
    /// before the cell's built-in handling.
    pub fn with_system_hook(
        path: impl Into<String>,
        dispatcher: Arc<dyn Dispatcher>,
        handler: impl Fn(Envelope) + Send + Sync + 'static,
        system_hook: Option<Box<SystemHook>>,
    ) -> Arc<Self> {
        let cell = Arc::new(Self {
            path: path.into(),
            mailbox: Mailbox::new(),
            dispatcher,
            handler: Box::new(handler),
            system_hook,
        });
        let invoker: Weak<dyn MessageInvoker> = Arc::downgrade(&cell) as Weak<dyn MessageInvoker>;
        cell.mailbox.register(invoker, Arc::clone(&cell.dispatcher));

        if cell.mailbox.try_add_system(SystemMessage::Start) {
            cell.dispatcher.try_execute_mailbox(&cell.mailbox);
        }
        cell
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// Submits an envelope through this cell's dispatcher.
    pub fn send(&self, envelope: Envelope) {
        self.dispatcher.dispatch(self, envelope);
    }

    /// Requests an orderly stop: a [`SystemMessage::Stop`] jumps the user
    /// queue and closes the mailbox when invoked.
    pub fn stop(&self) {
        if self.mailbox.try_add_system(SystemMessage::Stop) {
            self.dispatcher.try_execute_mailbox(&self.mailbox);
        }
    }

    /// Cheap addressable handle to this cell.
    pub fn actor_ref(self: &Arc<Self>) -> ActorRef {
        ActorRef {
            path: Arc::from(self.path.as_str()),
            cell: Arc::downgrade(self),
        }
    }
}

impl MessageInvoker for ActorCell {
    fn invoke_user(&self, envelope: Envelope) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(envelope)));
        if let Err(payload) = result {
            // Log-and-continue: one poisoned message must not take down the
            // drain or the actor.
            error!(
                path = %self.path,
                panic = %panic_message(payload),
                "user handler panicked; continuing"
            );
        }
    }

    fn invoke_system(&self, message: SystemMessage) {
        if let Some(hook) = &self.system_hook {
            let result = panic::catch_unwind(AssertUnwindSafe(|| hook(&message)));
            if let Err(payload) = result {
                error!(
                    path = %self.path,
                    panic = %panic_message(payload),
                    "system hook panicked; continuing"
                );
            }
        }
        match message {
            SystemMessage::Start => {
                debug!(path = %self.path, "actor started");
            }
            SystemMessage::Stop => {
                debug!(path = %self.path, "actor stopped; closing mailbox");
                self.mailbox.close();
            }
            SystemMessage::ChildStopped { path } => {
                debug!(path = %self.path, child = %path, "child stopped");
            }
        }
    }
}

/// Clonable reference to an actor: a path plus a weak cell handle.
///
/// Sending to a stopped or dropped actor is a silent drop.
#[derive(Clone)]
pub struct ActorRef {
    path: Arc<str>,
    cell: Weak<ActorCell>,
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("path", &self.path)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl ActorRef {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_alive(&self) -> bool {
        self.cell
            .upgrade()
            .map(|cell| !cell.mailbox().is_closed())
            .unwrap_or(false)
    }

    /// Sends a message with no sender reference.
    pub fn tell(&self, message: BoxedMessage) {
        if let Some(cell) = self.cell.upgrade() {
            cell.send(Envelope::new(message));
        }
    }

    /// Sends a message carrying `sender` so the receiver can reply.
    pub fn tell_from(&self, message: BoxedMessage, sender: ActorRef) {
        if let Some(cell) = self.cell.upgrade() {
            cell.send(Envelope::with_sender(message, sender));
        }
    }

    pub fn stop(&self) {
        if let Some(cell) = self.cell.upgrade() {
            cell.stop();
        }
    }
}

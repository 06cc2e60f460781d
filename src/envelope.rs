use std::any::Any;
use std::fmt;

use crate::actor::ActorRef;

/// Type-erased message payload.
pub type BoxedMessage = Box<dyn Any + Send>;

/// A message plus the reference of its sender, the unit enqueued into a
/// mailbox. Created by a producer at dispatch time and consumed exactly once
/// by the owning actor's handler.
pub struct Envelope {
    pub message: BoxedMessage,
    pub sender: Option<ActorRef>,
}

impl Envelope {
    pub fn new(message: BoxedMessage) -> Self {
        Self { message, sender: None }
    }

    pub fn with_sender(message: BoxedMessage, sender: ActorRef) -> Self {
        Self { message, sender: Some(sender) }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &"<boxed-message>")
            .field("sender", &self.sender.as_ref().map(ActorRef::path))
            .finish()
    }
}

/// Lifecycle and control messages, carried on a mailbox's system queue.
///
/// System messages always drain ahead of user envelopes and are never
/// subject to the dispatcher's throughput cap.
#[derive(Debug)]
pub enum SystemMessage {
    /// The actor has been created and wired.
    Start,
    /// Stop the actor; invoking this closes the mailbox.
    Stop,
    /// A child actor has stopped.
    ChildStopped { path: String },
}

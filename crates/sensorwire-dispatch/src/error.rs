//! Error types for event dispatch.

use crate::event::EventClass;

/// Errors returned to producers and at dispatcher construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The queue for this event class has no free slot.
    #[error("{class} queue is full")]
    QueueFull {
        /// Class of the rejected event.
        class: EventClass,
    },

    /// The dispatcher has shut down and accepts no more events.
    #[error("{class} queue is closed")]
    Closed {
        /// Class of the rejected event.
        class: EventClass,
    },

    /// Queue depth or pool size is unusable.
    #[error("invalid dispatch settings: {message}")]
    InvalidSettings {
        /// What is wrong.
        message: String,
    },
}

/// Failure reported by a [`Publisher`](crate::publisher::Publisher).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("publish to {topic:?} failed: {message}")]
pub struct PublishError {
    /// Topic the payload was meant for.
    pub topic: String,
    /// Transport error description.
    pub message: String,
}

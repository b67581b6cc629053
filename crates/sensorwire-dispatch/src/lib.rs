//! Event dispatch for sensorwire.
//!
//! Entity change events enter through one of two bounded queues (create and
//! update), are drained by fixed worker pools, matched against the live
//! [`SubscriptionRegistry`](sensorwire_core::SubscriptionRegistry), and
//! published once per matching subscription through a [`Publisher`].
//!
//! # Modules
//!
//! - [`event`] -- Change events, stages, and outcomes
//! - [`dispatcher`] -- Queues, worker pools, and the per-event pipeline
//! - [`publisher`] -- The outbound transport seam
//! - [`error`] -- Dispatch and publish errors

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod publisher;

pub use dispatcher::{
    DispatchSettings, DispatchStats, Dispatcher, Pipeline, QueueSettings, StatsSnapshot,
};
pub use error::{DispatchError, PublishError};
pub use event::{ChangeEvent, DispatchStage, DropReason, EventClass, EventOutcome, EventPayload};
pub use publisher::Publisher;

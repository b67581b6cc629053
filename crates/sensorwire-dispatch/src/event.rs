//! Change events and their processing outcome.
//!
//! An event moves through
//! `Queued -> Materializing -> Matching -> Formatting -> Published | Dropped`.
//! The first four are [`DispatchStage`]s, logged as the worker reaches them;
//! the last two are the [`EventOutcome`].

use std::fmt;

use sensorwire_codec::{CodecError, Row};
use sensorwire_types::{Entity, EntityType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which queue an event is admitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// The entity was inserted.
    Create,
    /// The entity was modified.
    Update,
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// What the storage layer handed over.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// An entity that is already materialized.
    Entity(Entity),
    /// A raw storage row still to be materialized.
    Row {
        /// Layout of the row.
        entity_type: EntityType,
        /// The row itself.
        row: Row,
    },
}

/// One entity lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Correlation id for logs.
    pub id: Uuid,
    /// Create or update.
    pub class: EventClass,
    /// The changed entity, in whatever form it arrived.
    pub payload: EventPayload,
}

impl ChangeEvent {
    /// An event carrying a materialized entity.
    pub fn entity(class: EventClass, entity: Entity) -> Self {
        Self {
            id: Uuid::now_v7(),
            class,
            payload: EventPayload::Entity(entity),
        }
    }

    /// An event carrying a raw row of `entity_type`.
    pub fn row(class: EventClass, entity_type: EntityType, row: Row) -> Self {
        Self {
            id: Uuid::now_v7(),
            class,
            payload: EventPayload::Row { entity_type, row },
        }
    }

    /// Shorthand for a create event with a materialized entity.
    pub fn created(entity: Entity) -> Self {
        Self::entity(EventClass::Create, entity)
    }

    /// Shorthand for an update event with a materialized entity.
    pub fn updated(entity: Entity) -> Self {
        Self::entity(EventClass::Update, entity)
    }

    /// Type of the changed entity.
    pub const fn entity_type(&self) -> EntityType {
        match &self.payload {
            EventPayload::Entity(entity) => entity.entity_type(),
            EventPayload::Row { entity_type, .. } => *entity_type,
        }
    }
}

/// Intermediate processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    /// Waiting in a queue.
    Queued,
    /// Turning a row into an entity.
    Materializing,
    /// Testing subscriptions.
    Matching,
    /// Rendering payloads.
    Formatting,
}

/// Why an event produced no publication.
#[derive(Debug, thiserror::Error)]
pub enum DropReason {
    /// The row could not be materialized.
    #[error("materialization failed: {0}")]
    Codec(#[from] CodecError),
    /// No subscription matched.
    #[error("no matching subscription")]
    NoMatch,
}

/// Terminal state of one event.
#[derive(Debug)]
pub enum EventOutcome {
    /// At least one subscription matched.
    Published {
        /// Payloads the publisher accepted.
        delivered: usize,
        /// Matching subscriptions whose payload could not be formatted or
        /// published.
        failed: usize,
    },
    /// Nothing was published.
    Dropped(DropReason),
}

impl EventOutcome {
    /// Payloads the publisher accepted.
    pub const fn delivered(&self) -> usize {
        match self {
            Self::Published { delivered, .. } => *delivered,
            Self::Dropped(_) => 0,
        }
    }
}

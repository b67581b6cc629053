//! Shared type definitions for sensorwire.
//!
//! Everything that crosses a crate boundary lives here: entity identity and
//! type enumerations, the materialized [`Entity`] with its attribute values,
//! the closed time and result unions, geometry payloads, and the JSON
//! rendering used for notification payloads.
//!
//! # Modules
//!
//! - [`ids`] -- Numeric entity identifier
//! - [`enums`] -- Entity types, properties, result discriminator
//! - [`time`] -- Instants, intervals, and their union
//! - [`result`] -- Observation result values
//! - [`geometry`] -- Simple `GeoJSON` geometries and their fallbacks
//! - [`entity`] -- The entity record and related-entity handles
//! - [`format`] -- JSON rendering with links and projection

pub mod entity;
pub mod enums;
pub mod format;
pub mod geometry;
pub mod ids;
pub mod result;
pub mod time;

// Re-export all public types at crate root for convenience.
pub use entity::{Attribute, Entity, Related, UnitOfMeasurement};
pub use enums::{EntityType, Property, ResultKind};
pub use format::{format_entity, resolve_selection};
pub use geometry::{Geometry, GeometryValue};
pub use ids::EntityId;
pub use result::{Number, ResultValue};
pub use time::{TimeInstant, TimeInterval, TimeValue};

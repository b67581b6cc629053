//! Storage row to entity materialization.
//!
//! The storage layer delivers flat rows; this crate turns them back into
//! typed [`Entity`](sensorwire_types::Entity) values. Decoding is driven by
//! one static table per entity type, shared with [`columns_needed`] so the
//! query side fetches exactly what the materializer reads.
//!
//! # Modules
//!
//! - [`row`] -- Raw cells and strict typed readers
//! - [`schema`] -- Per-type column tables
//! - [`resolve`] -- Time, geometry, and result decoding rules
//! - [`materialize`] -- The generic materializer
//! - [`wkt`] -- WKT polygon reader
//! - [`error`] -- Codec error type

pub mod error;
pub mod materialize;
pub mod resolve;
pub mod row;
pub mod schema;
pub mod wkt;

// Re-export primary types for convenience.
pub use error::CodecError;
pub use materialize::{columns_needed, columns_needed_by_name, materialize, materialize_set};
pub use resolve::{ResultColumns, decode_geometry, decode_result, interval, time_value};
pub use row::{CellValue, Row};
pub use schema::{ID_COLUMN, PropertySpec, Source, schema_for};

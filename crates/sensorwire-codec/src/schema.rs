//! Static column layout of every entity type.
//!
//! Each entity type owns one table of [`PropertySpec`]s: which property is
//! produced, from which column(s), and how the raw cells are decoded. The
//! materializer and [`columns_needed`](crate::columns_needed) both walk
//! these tables, so the two can never disagree.

use std::collections::BTreeSet;

use sensorwire_types::{EntityType, Property};

/// Primary key column, present on every table.
pub const ID_COLUMN: &str = "id";

/// Observation result columns.
pub mod result_columns {
    /// Discriminator selecting which column holds the result.
    pub const TYPE: &str = "result_type";
    /// Floating point form of a numeric result.
    pub const NUMBER: &str = "result_number";
    /// String form of the result (exact numbers, plain strings).
    pub const STRING: &str = "result_string";
    /// Boolean result.
    pub const BOOLEAN: &str = "result_boolean";
    /// JSON result (objects and arrays).
    pub const JSON: &str = "result_json";
}

/// How one property is read from its column(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Plain text column.
    Text(&'static str),
    /// JSON text holding an object. JSON `null` yields no attribute.
    JsonObject(&'static str),
    /// JSON text holding any value. JSON `null` yields no attribute.
    Json(&'static str),
    /// Start/end pair read as an instant or an interval.
    TimeValue {
        /// Start column.
        start: &'static str,
        /// End column.
        end: &'static str,
    },
    /// Start/end pair read as an interval only when both are set.
    BoundedInterval {
        /// Start column.
        start: &'static str,
        /// End column.
        end: &'static str,
    },
    /// Single timestamp; null reads as the unset instant.
    Instant(&'static str),
    /// Geometry-bearing text column.
    Geometry {
        /// Column holding the media type, if the table has one.
        encoding: Option<&'static str>,
        /// Column holding the geometry text.
        value: &'static str,
    },
    /// The observation result column group.
    Result,
    /// Unit of measurement spread over three text columns.
    UnitOfMeasurement {
        /// Unit name column.
        name: &'static str,
        /// Unit symbol column.
        symbol: &'static str,
        /// Unit definition column.
        definition: &'static str,
    },
    /// JSON list of units of measurement.
    UnitList(&'static str),
    /// JSON list of strings.
    TextList(&'static str),
    /// Foreign key to another entity.
    Reference {
        /// Foreign key column.
        column: &'static str,
        /// Type of the referenced entity.
        target: EntityType,
    },
}

impl Source {
    /// Add the columns this source reads to `out`.
    pub fn collect_columns(&self, out: &mut BTreeSet<&'static str>) {
        match *self {
            Self::Text(c)
            | Self::JsonObject(c)
            | Self::Json(c)
            | Self::Instant(c)
            | Self::UnitList(c)
            | Self::TextList(c)
            | Self::Reference { column: c, .. } => {
                out.insert(c);
            }
            Self::TimeValue { start, end } | Self::BoundedInterval { start, end } => {
                out.insert(start);
                out.insert(end);
            }
            Self::Geometry { encoding, value } => {
                if let Some(encoding) = encoding {
                    out.insert(encoding);
                }
                out.insert(value);
            }
            Self::Result => {
                out.extend([
                    result_columns::TYPE,
                    result_columns::NUMBER,
                    result_columns::STRING,
                    result_columns::BOOLEAN,
                    result_columns::JSON,
                ]);
            }
            Self::UnitOfMeasurement {
                name,
                symbol,
                definition,
            } => {
                out.extend([name, symbol, definition]);
            }
        }
    }
}

/// One property and where it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    /// The produced property.
    pub property: Property,
    /// How it is read.
    pub source: Source,
}

const fn entry(property: Property, source: Source) -> PropertySpec {
    PropertySpec { property, source }
}

// ---------------------------------------------------------------------------
// Per-type tables
// ---------------------------------------------------------------------------

const THING: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(Property::Properties, Source::JsonObject("properties")),
];

const LOCATION: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(Property::EncodingType, Source::Text("encoding_type")),
    entry(
        Property::Location,
        Source::Geometry {
            encoding: Some("encoding_type"),
            value: "location",
        },
    ),
];

const HISTORICAL_LOCATION: &[PropertySpec] = &[
    entry(Property::Time, Source::Instant("time")),
    entry(
        Property::Thing,
        Source::Reference {
            column: "thing_id",
            target: EntityType::Thing,
        },
    ),
];

const SENSOR: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(Property::EncodingType, Source::Text("encoding_type")),
    entry(Property::Metadata, Source::Text("metadata")),
];

const OBSERVED_PROPERTY: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Definition, Source::Text("definition")),
    entry(Property::Description, Source::Text("description")),
];

const DATASTREAM: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(Property::ObservationType, Source::Text("observation_type")),
    entry(
        Property::UnitOfMeasurement,
        Source::UnitOfMeasurement {
            name: "unit_name",
            symbol: "unit_symbol",
            definition: "unit_definition",
        },
    ),
    entry(
        Property::ObservedArea,
        Source::Geometry {
            encoding: None,
            value: "observed_area",
        },
    ),
    entry(
        Property::PhenomenonTime,
        Source::BoundedInterval {
            start: "phenomenon_time_start",
            end: "phenomenon_time_end",
        },
    ),
    entry(
        Property::ResultTime,
        Source::BoundedInterval {
            start: "result_time_start",
            end: "result_time_end",
        },
    ),
    entry(
        Property::Sensor,
        Source::Reference {
            column: "sensor_id",
            target: EntityType::Sensor,
        },
    ),
    entry(
        Property::ObservedProperty,
        Source::Reference {
            column: "obs_property_id",
            target: EntityType::ObservedProperty,
        },
    ),
    entry(
        Property::Thing,
        Source::Reference {
            column: "thing_id",
            target: EntityType::Thing,
        },
    ),
];

const MULTI_DATASTREAM: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(
        Property::MultiObservationDataTypes,
        Source::TextList("observation_types"),
    ),
    entry(
        Property::UnitOfMeasurements,
        Source::UnitList("unit_of_measurements"),
    ),
    entry(
        Property::ObservedArea,
        Source::Geometry {
            encoding: None,
            value: "observed_area",
        },
    ),
    entry(
        Property::PhenomenonTime,
        Source::BoundedInterval {
            start: "phenomenon_time_start",
            end: "phenomenon_time_end",
        },
    ),
    entry(
        Property::ResultTime,
        Source::BoundedInterval {
            start: "result_time_start",
            end: "result_time_end",
        },
    ),
    entry(
        Property::Sensor,
        Source::Reference {
            column: "sensor_id",
            target: EntityType::Sensor,
        },
    ),
    entry(
        Property::Thing,
        Source::Reference {
            column: "thing_id",
            target: EntityType::Thing,
        },
    ),
];

const OBSERVATION: &[PropertySpec] = &[
    entry(
        Property::PhenomenonTime,
        Source::TimeValue {
            start: "phenomenon_time_start",
            end: "phenomenon_time_end",
        },
    ),
    entry(Property::ResultTime, Source::Instant("result_time")),
    entry(Property::Result, Source::Result),
    entry(Property::ResultQuality, Source::Json("result_quality")),
    entry(
        Property::ValidTime,
        Source::BoundedInterval {
            start: "valid_time_start",
            end: "valid_time_end",
        },
    ),
    entry(Property::Parameters, Source::JsonObject("parameters")),
    entry(
        Property::Datastream,
        Source::Reference {
            column: "datastream_id",
            target: EntityType::Datastream,
        },
    ),
    entry(
        Property::MultiDatastream,
        Source::Reference {
            column: "multi_datastream_id",
            target: EntityType::MultiDatastream,
        },
    ),
    entry(
        Property::FeatureOfInterest,
        Source::Reference {
            column: "feature_id",
            target: EntityType::FeatureOfInterest,
        },
    ),
];

const FEATURE_OF_INTEREST: &[PropertySpec] = &[
    entry(Property::Name, Source::Text("name")),
    entry(Property::Description, Source::Text("description")),
    entry(Property::EncodingType, Source::Text("encoding_type")),
    entry(
        Property::Feature,
        Source::Geometry {
            encoding: Some("encoding_type"),
            value: "feature",
        },
    ),
];

/// The property table of `entity_type`, excluding the primary key.
pub const fn schema_for(entity_type: EntityType) -> &'static [PropertySpec] {
    match entity_type {
        EntityType::Thing => THING,
        EntityType::Location => LOCATION,
        EntityType::HistoricalLocation => HISTORICAL_LOCATION,
        EntityType::Sensor => SENSOR,
        EntityType::ObservedProperty => OBSERVED_PROPERTY,
        EntityType::Datastream => DATASTREAM,
        EntityType::MultiDatastream => MULTI_DATASTREAM,
        EntityType::Observation => OBSERVATION,
        EntityType::FeatureOfInterest => FEATURE_OF_INTEREST,
    }
}

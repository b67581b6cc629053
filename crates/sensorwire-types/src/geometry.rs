//! Geometry payloads carried by locations, features, and datastreams.
//!
//! Only simple `GeoJSON` geometries are modelled. Anything that does not fit
//! degrades to a generic JSON object or, failing that, to the raw string as
//! stored.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const GEOMETRY_TYPES: &[&str] = &["Point", "LineString", "Polygon"];

/// A simple `GeoJSON` geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// `[x, y]` or `[x, y, z]`.
        coordinates: Vec<f64>,
    },
    /// An ordered list of positions.
    LineString {
        /// Positions along the line.
        coordinates: Vec<Vec<f64>>,
    },
    /// An exterior ring followed by zero or more holes.
    Polygon {
        /// Linear rings; each is closed (first position == last).
        coordinates: Vec<Vec<Vec<f64>>>,
    },
}

/// `type` and `coordinates` read without buffering, so coordinates parse
/// the same way whatever number representation `serde_json` is built with.
#[derive(Deserialize)]
struct TaggedGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let TaggedGeometry { kind, coordinates } = TaggedGeometry::deserialize(deserializer)?;
        let geometry = match kind.as_str() {
            "Point" => serde_json::from_value(coordinates).map(|coordinates| Self::Point {
                coordinates,
            }),
            "LineString" => serde_json::from_value(coordinates)
                .map(|coordinates| Self::LineString { coordinates }),
            "Polygon" => serde_json::from_value(coordinates)
                .map(|coordinates| Self::Polygon { coordinates }),
            other => return Err(D::Error::unknown_variant(other, GEOMETRY_TYPES)),
        };
        geometry.map_err(D::Error::custom)
    }
}

impl Geometry {
    /// `GeoJSON` form.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A decoded geometry-bearing column.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryValue {
    /// A recognised geometry.
    Geometry(Geometry),
    /// Some other JSON object.
    Json(Map<String, Value>),
    /// The stored text, unparsed.
    Text(String),
}

impl GeometryValue {
    /// JSON form of the decoded value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Geometry(g) => g.to_json(),
            Self::Json(map) => Value::Object(map.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

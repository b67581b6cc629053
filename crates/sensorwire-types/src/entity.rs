//! The entity record and its attribute values.
//!
//! An [`Entity`] is a fully materialized record: its type, its primary key
//! (absent when the row was produced in a context without identity), and a
//! map of decoded attributes. Related entities reached through a foreign key
//! are held as [`Related`], which keeps references and fully expanded
//! entities apart at the type level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::{EntityType, Property};
use crate::geometry::GeometryValue;
use crate::ids::EntityId;
use crate::result::ResultValue;
use crate::time::TimeValue;

/// Unit of measurement of a datastream (or of one member of a multi
/// datastream).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasurement {
    /// Full name of the unit, e.g. `degree Celsius`.
    #[serde(default)]
    pub name: Option<String>,
    /// Symbol of the unit, e.g. `°C`.
    #[serde(default)]
    pub symbol: Option<String>,
    /// URI defining the unit.
    #[serde(default)]
    pub definition: Option<String>,
}

impl UnitOfMeasurement {
    /// JSON form. Unset fields are emitted as `null`.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A related entity reached through a navigation property.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// Identity only. Serialized as a navigation link, never inline.
    Reference {
        /// Type of the referenced entity.
        entity_type: EntityType,
        /// Primary key of the referenced entity.
        id: EntityId,
    },
    /// A fully materialized entity, serialized inline.
    Full(Box<Entity>),
}

impl Related {
    /// A reference to `entity_type` with primary key `id`.
    pub const fn reference(entity_type: EntityType, id: EntityId) -> Self {
        Self::Reference { entity_type, id }
    }

    /// Primary key of the related entity, if known.
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Reference { id, .. } => Some(*id),
            Self::Full(entity) => entity.id(),
        }
    }

    /// Type of the related entity.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Reference { entity_type, .. } => *entity_type,
            Self::Full(entity) => entity.entity_type(),
        }
    }

    /// Whether this is a bare reference.
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Plain text.
    Text(String),
    /// A free-form JSON object (`properties`, `parameters`).
    Object(Map<String, Value>),
    /// Arbitrary JSON (`resultQuality`).
    Json(Value),
    /// A time instant or interval.
    Time(TimeValue),
    /// A geometry, generic JSON object, or raw string.
    Geometry(GeometryValue),
    /// An observation result.
    Result(ResultValue),
    /// A single unit of measurement.
    Unit(UnitOfMeasurement),
    /// A list of units of measurement.
    Units(Vec<UnitOfMeasurement>),
    /// A list of strings.
    TextList(Vec<String>),
    /// A related entity.
    Related(Related),
}

impl Attribute {
    /// JSON form of the value. Related entities are not representable as a
    /// plain value; callers render them as links or inline objects.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Object(map) => Value::Object(map.clone()),
            Self::Json(v) => v.clone(),
            Self::Time(t) => t.to_json(),
            Self::Geometry(g) => g.to_json(),
            Self::Result(r) => r.to_json(),
            Self::Unit(u) => u.to_json(),
            Self::Units(units) => {
                Value::Array(units.iter().map(UnitOfMeasurement::to_json).collect())
            }
            Self::TextList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            Self::Related(_) => Value::Null,
        }
    }
}

/// A materialized entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    entity_type: EntityType,
    id: Option<EntityId>,
    attributes: BTreeMap<Property, Attribute>,
}

impl Entity {
    /// An empty entity of the given type without identity.
    pub const fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the primary key (builder style).
    #[must_use]
    pub const fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set an attribute (builder style).
    #[must_use]
    pub fn with(mut self, property: Property, value: Attribute) -> Self {
        self.set(property, value);
        self
    }

    /// The entity type.
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The primary key. `None` when the entity was materialized without
    /// identity; callers must check.
    pub const fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Replace the primary key.
    pub const fn set_id(&mut self, id: Option<EntityId>) {
        self.id = id;
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, property: Property, value: Attribute) {
        self.attributes.insert(property, value);
    }

    /// Read an attribute. Absent attributes return `None`.
    pub fn get(&self, property: Property) -> Option<&Attribute> {
        self.attributes.get(&property)
    }

    /// Read a navigation property.
    pub fn related(&self, property: Property) -> Option<&Related> {
        match self.attributes.get(&property) {
            Some(Attribute::Related(related)) => Some(related),
            _ => None,
        }
    }

    /// Iterate over all set attributes in property order.
    pub fn attributes(&self) -> impl Iterator<Item = (Property, &Attribute)> {
        self.attributes.iter().map(|(p, a)| (*p, a))
    }

    /// Absolute URL of this entity below `service_root_url`, if it has an id.
    pub fn self_link(&self, service_root_url: &str) -> Option<String> {
        self.id.map(|id| {
            format!(
                "{}/{}({id})",
                service_root_url.trim_end_matches('/'),
                self.entity_type.entity_set()
            )
        })
    }
}

//! Enumeration types for the sensor data model.
//!
//! The entity type set is closed: every stored row, every subscription, and
//! every change event names exactly one [`EntityType`]. [`Property`] lists
//! every attribute and to-one navigation property that can appear on an
//! entity, and [`ResultKind`] is the stored discriminator that decides how
//! an observation result is read back.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

/// The kind of a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A physical or virtual object that carries sensors.
    Thing,
    /// The place where a thing is (or was) located.
    Location,
    /// A past location of a thing, recorded with a timestamp.
    HistoricalLocation,
    /// An instrument that observes a property.
    Sensor,
    /// The phenomenon that is observed.
    ObservedProperty,
    /// A series of observations of one observed property by one sensor.
    Datastream,
    /// A series of observations with a multi-valued result.
    MultiDatastream,
    /// A single measurement.
    Observation,
    /// The feature an observation was made of.
    FeatureOfInterest,
}

impl EntityType {
    /// Every entity type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Thing,
        Self::Location,
        Self::HistoricalLocation,
        Self::Sensor,
        Self::ObservedProperty,
        Self::Datastream,
        Self::MultiDatastream,
        Self::Observation,
        Self::FeatureOfInterest,
    ];

    /// Singular name, as used for navigation properties.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Thing => "Thing",
            Self::Location => "Location",
            Self::HistoricalLocation => "HistoricalLocation",
            Self::Sensor => "Sensor",
            Self::ObservedProperty => "ObservedProperty",
            Self::Datastream => "Datastream",
            Self::MultiDatastream => "MultiDatastream",
            Self::Observation => "Observation",
            Self::FeatureOfInterest => "FeatureOfInterest",
        }
    }

    /// Entity set (collection) name, as used in resource paths.
    pub const fn entity_set(self) -> &'static str {
        match self {
            Self::Thing => "Things",
            Self::Location => "Locations",
            Self::HistoricalLocation => "HistoricalLocations",
            Self::Sensor => "Sensors",
            Self::ObservedProperty => "ObservedProperties",
            Self::Datastream => "Datastreams",
            Self::MultiDatastream => "MultiDatastreams",
            Self::Observation => "Observations",
            Self::FeatureOfInterest => "FeaturesOfInterest",
        }
    }

    /// Look up an entity type by its entity set name.
    pub fn from_entity_set(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.entity_set() == name)
    }

    /// Attribute properties (non-navigation) carried by this type,
    /// excluding the identifier and self link.
    pub const fn attributes(self) -> &'static [Property] {
        match self {
            Self::Thing => &[Property::Name, Property::Description, Property::Properties],
            Self::Location => &[
                Property::Name,
                Property::Description,
                Property::EncodingType,
                Property::Location,
            ],
            Self::HistoricalLocation => &[Property::Time],
            Self::Sensor => &[
                Property::Name,
                Property::Description,
                Property::EncodingType,
                Property::Metadata,
            ],
            Self::ObservedProperty => &[
                Property::Name,
                Property::Definition,
                Property::Description,
            ],
            Self::Datastream => &[
                Property::Name,
                Property::Description,
                Property::ObservationType,
                Property::UnitOfMeasurement,
                Property::ObservedArea,
                Property::PhenomenonTime,
                Property::ResultTime,
            ],
            Self::MultiDatastream => &[
                Property::Name,
                Property::Description,
                Property::MultiObservationDataTypes,
                Property::UnitOfMeasurements,
                Property::ObservedArea,
                Property::PhenomenonTime,
                Property::ResultTime,
            ],
            Self::Observation => &[
                Property::PhenomenonTime,
                Property::ResultTime,
                Property::Result,
                Property::ResultQuality,
                Property::ValidTime,
                Property::Parameters,
            ],
            Self::FeatureOfInterest => &[
                Property::Name,
                Property::Description,
                Property::EncodingType,
                Property::Feature,
            ],
        }
    }

    /// To-one navigation properties backed by a foreign key column.
    pub const fn navigation_properties(self) -> &'static [Property] {
        match self {
            Self::HistoricalLocation => &[Property::Thing],
            Self::Datastream => &[Property::Thing, Property::Sensor, Property::ObservedProperty],
            Self::MultiDatastream => &[Property::Thing, Property::Sensor],
            Self::Observation => &[
                Property::Datastream,
                Property::MultiDatastream,
                Property::FeatureOfInterest,
            ],
            Self::Thing
            | Self::Location
            | Self::Sensor
            | Self::ObservedProperty
            | Self::FeatureOfInterest => &[],
        }
    }

    /// Whether `property` exists on this entity type.
    pub fn has_property(self, property: Property) -> bool {
        matches!(property, Property::Id | Property::SelfLink)
            || self.attributes().contains(&property)
            || self.navigation_properties().contains(&property)
    }

    /// The navigation property on this type that points at `parent`, if any.
    pub fn navigation_to(self, parent: Self) -> Option<Property> {
        self.navigation_properties()
            .iter()
            .copied()
            .find(|p| p.navigation_target() == Some(parent))
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// An attribute or to-one navigation property of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Property {
    /// The primary key.
    Id,
    /// Absolute URL of the entity.
    SelfLink,
    /// Human-readable name.
    Name,
    /// Free-text description.
    Description,
    /// URI defining an observed property.
    Definition,
    /// Free-form key/value map on a thing.
    Properties,
    /// Media type of a location, feature, or sensor metadata.
    EncodingType,
    /// Location geometry.
    Location,
    /// Feature geometry.
    Feature,
    /// Sensor metadata document or link.
    Metadata,
    /// Timestamp of a historical location.
    Time,
    /// Time (instant or interval) the observation applies to.
    PhenomenonTime,
    /// Time the result was produced.
    ResultTime,
    /// Validity period of an observation.
    ValidTime,
    /// Observation result.
    Result,
    /// Quality information on a result.
    ResultQuality,
    /// Free-form key/value map on an observation.
    Parameters,
    /// Observation type URI of a datastream.
    ObservationType,
    /// Observation type URIs of the members of a multi datastream.
    MultiObservationDataTypes,
    /// Unit of a datastream.
    UnitOfMeasurement,
    /// Units of the members of a multi datastream.
    UnitOfMeasurements,
    /// Spatial extent of the observations of a datastream.
    ObservedArea,
    /// Navigation to the owning thing.
    Thing,
    /// Navigation to the owning datastream.
    Datastream,
    /// Navigation to the owning multi datastream.
    MultiDatastream,
    /// Navigation to the sensor.
    Sensor,
    /// Navigation to the observed property.
    ObservedProperty,
    /// Navigation to the feature of interest.
    FeatureOfInterest,
}

impl Property {
    /// Name of the property as used in `$select` and resource paths.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::SelfLink => "selfLink",
            Self::Name => "name",
            Self::Description => "description",
            Self::Definition => "definition",
            Self::Properties => "properties",
            Self::EncodingType => "encodingType",
            Self::Location => "location",
            Self::Feature => "feature",
            Self::Metadata => "metadata",
            Self::Time => "time",
            Self::PhenomenonTime => "phenomenonTime",
            Self::ResultTime => "resultTime",
            Self::ValidTime => "validTime",
            Self::Result => "result",
            Self::ResultQuality => "resultQuality",
            Self::Parameters => "parameters",
            Self::ObservationType => "observationType",
            Self::MultiObservationDataTypes => "multiObservationDataTypes",
            Self::UnitOfMeasurement => "unitOfMeasurement",
            Self::UnitOfMeasurements => "unitOfMeasurements",
            Self::ObservedArea => "observedArea",
            Self::Thing => "Thing",
            Self::Datastream => "Datastream",
            Self::MultiDatastream => "MultiDatastream",
            Self::Sensor => "Sensor",
            Self::ObservedProperty => "ObservedProperty",
            Self::FeatureOfInterest => "FeatureOfInterest",
        }
    }

    /// Look up a property by name. The `@iot.` annotated forms of the
    /// identifier and self link are accepted as well.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "@iot.id" => return Some(Self::Id),
            "@iot.selfLink" => return Some(Self::SelfLink),
            _ => {}
        }
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Every property, in declaration order.
    pub const ALL: [Self; 28] = [
        Self::Id,
        Self::SelfLink,
        Self::Name,
        Self::Description,
        Self::Definition,
        Self::Properties,
        Self::EncodingType,
        Self::Location,
        Self::Feature,
        Self::Metadata,
        Self::Time,
        Self::PhenomenonTime,
        Self::ResultTime,
        Self::ValidTime,
        Self::Result,
        Self::ResultQuality,
        Self::Parameters,
        Self::ObservationType,
        Self::MultiObservationDataTypes,
        Self::UnitOfMeasurement,
        Self::UnitOfMeasurements,
        Self::ObservedArea,
        Self::Thing,
        Self::Datastream,
        Self::MultiDatastream,
        Self::Sensor,
        Self::ObservedProperty,
        Self::FeatureOfInterest,
    ];

    /// The entity type a navigation property points at.
    pub const fn navigation_target(self) -> Option<EntityType> {
        match self {
            Self::Thing => Some(EntityType::Thing),
            Self::Datastream => Some(EntityType::Datastream),
            Self::MultiDatastream => Some(EntityType::MultiDatastream),
            Self::Sensor => Some(EntityType::Sensor),
            Self::ObservedProperty => Some(EntityType::ObservedProperty),
            Self::FeatureOfInterest => Some(EntityType::FeatureOfInterest),
            _ => None,
        }
    }

    /// Whether this is a navigation property.
    pub const fn is_navigation(self) -> bool {
        self.navigation_target().is_some()
    }
}

impl core::fmt::Display for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Observation result discriminator
// ---------------------------------------------------------------------------

/// Stored discriminator selecting which result column holds the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    /// Numeric result, read from the string column (exact) or the
    /// floating point column.
    Number,
    /// Boolean result.
    Boolean,
    /// Arbitrary JSON (objects and arrays).
    ObjectArray,
    /// Plain string result.
    String,
}

impl ResultKind {
    /// Decode the stored discriminator value.
    pub const fn from_discriminator(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Number),
            1 => Some(Self::Boolean),
            2 => Some(Self::ObjectArray),
            3 => Some(Self::String),
            _ => None,
        }
    }

    /// The value stored in the discriminator column.
    pub const fn discriminator(self) -> i64 {
        match self {
            Self::Number => 0,
            Self::Boolean => 1,
            Self::ObjectArray => 2,
            Self::String => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_set_names_round_trip() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::from_entity_set(t.entity_set()), Some(t));
        }
        assert_eq!(EntityType::from_entity_set("Thing"), None);
    }

    #[test]
    fn property_names_round_trip() {
        for p in Property::ALL {
            assert_eq!(Property::from_name(p.name()), Some(p));
        }
        assert_eq!(Property::from_name("@iot.id"), Some(Property::Id));
        assert_eq!(Property::from_name("colour"), None);
    }

    #[test]
    fn navigation_to_parent_follows_foreign_keys() {
        assert_eq!(
            EntityType::Observation.navigation_to(EntityType::Datastream),
            Some(Property::Datastream)
        );
        assert_eq!(
            EntityType::Datastream.navigation_to(EntityType::Thing),
            Some(Property::Thing)
        );
        assert_eq!(EntityType::Location.navigation_to(EntityType::Thing), None);
    }

    #[test]
    fn has_property_covers_id_attributes_and_navigation() {
        assert!(EntityType::Thing.has_property(Property::Id));
        assert!(EntityType::Thing.has_property(Property::Properties));
        assert!(EntityType::Observation.has_property(Property::FeatureOfInterest));
        assert!(!EntityType::Thing.has_property(Property::Result));
    }

    #[test]
    fn result_discriminator_round_trip() {
        for kind in [
            ResultKind::Number,
            ResultKind::Boolean,
            ResultKind::ObjectArray,
            ResultKind::String,
        ] {
            assert_eq!(ResultKind::from_discriminator(kind.discriminator()), Some(kind));
        }
        assert_eq!(ResultKind::from_discriminator(9), None);
    }
}

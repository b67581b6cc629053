//! Error types for topic parsing and subscription construction.

use sensorwire_types::{EntityType, Property};

/// Errors raised while parsing a query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// An option name that is not a known system query option.
    #[error("unknown query option `{name}`")]
    UnknownOption {
        /// The option as written.
        name: String,
    },

    /// The same option appears twice.
    #[error("query option `{name}` given more than once")]
    DuplicateOption {
        /// The repeated option.
        name: String,
    },

    /// An option without `=value`, or with a value that cannot be read.
    #[error("invalid value {value:?} for query option `{name}`")]
    InvalidValue {
        /// The option.
        name: String,
        /// The value as written.
        value: String,
    },
}

/// Errors raised while turning a topic into a subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The topic does not carry the configured prefix, or is empty.
    #[error("invalid topic {topic:?}: {reason}")]
    InvalidTopic {
        /// The topic as received.
        topic: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The path names an entity set that does not exist.
    #[error("unknown entity set `{name}`")]
    UnknownEntitySet {
        /// The segment as written.
        name: String,
    },

    /// The path names a property the entity type does not have.
    #[error("{entity_type} has no property `{name}`")]
    UnknownProperty {
        /// The entity type addressed.
        entity_type: EntityType,
        /// The segment as written.
        name: String,
    },

    /// The related collection is not reachable from the parent through a
    /// to-one navigation property.
    #[error("{child} is not related to {parent}")]
    UnrelatedSet {
        /// The parent entity type.
        parent: EntityType,
        /// The requested collection type.
        child: EntityType,
    },

    /// A query option other than `$select` on a collection topic, or any
    /// query on an entity or property topic.
    #[error("query option `{option}` is not allowed on topic {topic:?}")]
    OptionNotAllowed {
        /// The topic as received.
        topic: String,
        /// The rejected option.
        option: String,
    },

    /// The query string could not be parsed.
    #[error("invalid query: {source}")]
    Query {
        /// The underlying parse error.
        #[from]
        source: QueryError,
    },
}

/// Errors raised while evaluating a subscription filter against an entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The filter compares identities but the entity has none.
    #[error("{entity_type} entity has no id to compare")]
    MissingIdentity {
        /// Type of the entity under test.
        entity_type: EntityType,
    },

    /// The filter follows a navigation property the entity type lacks.
    #[error("{entity_type} has no navigation property `{navigation}`")]
    UnsupportedNavigation {
        /// Type of the entity under test.
        entity_type: EntityType,
        /// The navigation property named by the filter.
        navigation: Property,
    },
}

//! Topic grammar.
//!
//! ```text
//! topic := [prefix] path ["?" query]
//! path  := Set | Set "(" id ")" | Set "(" id ")/" property | Set "(" id ")/" RelatedSet
//! ```
//!
//! The query string is URL-decoded (`+` as space) before it is handed to a
//! [`QueryParser`](crate::query::QueryParser).

use sensorwire_types::{EntityId, EntityType, Property};

use crate::error::SubscriptionError;

/// The resource a topic addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourcePath {
    /// Every entity of a type, e.g. `Observations`.
    EntitySet(EntityType),
    /// One entity, e.g. `Datastreams(7)`.
    Entity {
        /// Type of the entity.
        entity_type: EntityType,
        /// Its id.
        id: EntityId,
    },
    /// One property of one entity, e.g. `Datastreams(7)/name`.
    Property {
        /// Type of the entity.
        entity_type: EntityType,
        /// Its id.
        id: EntityId,
        /// The addressed property.
        property: Property,
    },
    /// Entities related to one parent, e.g. `Datastreams(7)/Observations`.
    RelatedSet {
        /// Type of the parent.
        parent: EntityType,
        /// Id of the parent.
        parent_id: EntityId,
        /// Type of the collection.
        entity_type: EntityType,
        /// Navigation property on the collection type pointing at the
        /// parent.
        navigation: Property,
    },
}

impl ResourcePath {
    /// The type of the entities a subscription on this path receives.
    pub const fn entity_type(&self) -> EntityType {
        match *self {
            Self::EntitySet(entity_type)
            | Self::Entity { entity_type, .. }
            | Self::Property { entity_type, .. }
            | Self::RelatedSet { entity_type, .. } => entity_type,
        }
    }

    /// Whether the path addresses a collection.
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::EntitySet(_) | Self::RelatedSet { .. })
    }
}

/// A parsed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// The addressed resource.
    pub path: ResourcePath,
    /// The decoded query string, if the topic had one.
    pub query: Option<String>,
}

/// Parse `topic`, stripping `prefix` first.
///
/// # Errors
///
/// Returns [`SubscriptionError::InvalidTopic`] for a missing prefix, bad
/// escapes, or a path shape outside the grammar, and the more specific
/// variants for unknown sets, properties, or relations.
pub fn parse_topic(topic: &str, prefix: &str) -> Result<Topic, SubscriptionError> {
    let Some(rest) = topic.strip_prefix(prefix) else {
        return Err(invalid(topic, &format!("missing prefix {prefix:?}")));
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(decode_query(topic, query)?)),
        None => (rest, None),
    };
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Err(invalid(topic, "empty path"));
    }

    let mut segments = path.split('/');
    let first = segments.next().unwrap_or_default();
    let second = segments.next();
    if segments.next().is_some() {
        return Err(invalid(topic, "path has more than two segments"));
    }

    let (set_name, id) = split_key(topic, first)?;
    let entity_type = EntityType::from_entity_set(set_name).ok_or_else(|| {
        SubscriptionError::UnknownEntitySet {
            name: set_name.to_owned(),
        }
    })?;

    let path = match (id, second) {
        (None, None) => ResourcePath::EntitySet(entity_type),
        (Some(id), None) => ResourcePath::Entity { entity_type, id },
        (None, Some(_)) => {
            return Err(invalid(topic, "only a single entity can be navigated"));
        }
        (Some(id), Some(segment)) => navigate(entity_type, id, segment)?,
    };
    Ok(Topic {
        path,
        query: query.filter(|q| !q.is_empty()),
    })
}

fn navigate(
    parent: EntityType,
    parent_id: EntityId,
    segment: &str,
) -> Result<ResourcePath, SubscriptionError> {
    if let Some(child) = EntityType::from_entity_set(segment) {
        let navigation = child
            .navigation_to(parent)
            .ok_or(SubscriptionError::UnrelatedSet { parent, child })?;
        return Ok(ResourcePath::RelatedSet {
            parent,
            parent_id,
            entity_type: child,
            navigation,
        });
    }
    match Property::from_name(segment) {
        Some(property) if parent.has_property(property) && !property.is_navigation() => {
            Ok(ResourcePath::Property {
                entity_type: parent,
                id: parent_id,
                property,
            })
        }
        _ => Err(SubscriptionError::UnknownProperty {
            entity_type: parent,
            name: segment.to_owned(),
        }),
    }
}

/// Split `Set(id)` into the set name and the id.
fn split_key<'a>(
    topic: &str,
    segment: &'a str,
) -> Result<(&'a str, Option<EntityId>), SubscriptionError> {
    let Some(open) = segment.find('(') else {
        return Ok((segment, None));
    };
    let name = segment.get(..open).unwrap_or_default();
    let key = segment
        .get(open..)
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| invalid(topic, "unbalanced key parentheses"))?;
    let id = key
        .parse::<EntityId>()
        .map_err(|e| invalid(topic, &format!("invalid id {key:?}: {e}")))?;
    Ok((name, Some(id)))
}

fn decode_query(topic: &str, query: &str) -> Result<String, SubscriptionError> {
    let spaced = query.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| invalid(topic, &format!("query is not valid UTF-8: {e}")))
}

fn invalid(topic: &str, reason: &str) -> SubscriptionError {
    SubscriptionError::InvalidTopic {
        topic: topic.to_owned(),
        reason: reason.to_owned(),
    }
}

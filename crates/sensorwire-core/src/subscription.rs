//! Subscriptions: a topic bound to an entity type, an optional filter, and
//! an optional projection.
//!
//! A subscription is built once from its topic string and is immutable
//! afterwards. Two subscriptions are the same subscription when their
//! topics and selected properties agree.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use sensorwire_types::{Entity, EntityType, format_entity, resolve_selection};
use tracing::warn;

use crate::error::SubscriptionError;
use crate::filter::{Filter, FilterEvaluator};
use crate::query::QueryParser;
use crate::topic::{ResourcePath, parse_topic};

/// What kind of resource a subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Every entity of a type.
    EntitySet,
    /// Entities of a type related to one parent.
    RelatedSet,
    /// One entity.
    Entity,
    /// One property of one entity.
    Property,
}

/// An active interest in entity changes.
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: String,
    entity_type: EntityType,
    kind: SubscriptionKind,
    filter: Option<Filter>,
    selected_properties: BTreeSet<String>,
    service_root_url: String,
}

impl Subscription {
    /// Build a subscription from its topic.
    ///
    /// `prefix` is stripped from the topic before parsing. Collection
    /// topics accept `$select` and nothing else; entity and property
    /// topics accept no query at all.
    ///
    /// # Errors
    ///
    /// Returns a [`SubscriptionError`] when the topic or its query is
    /// malformed or uses options the topic kind does not allow.
    pub fn from_topic(
        topic: &str,
        prefix: &str,
        service_root_url: &str,
        parser: &dyn QueryParser,
    ) -> Result<Self, SubscriptionError> {
        let parsed = parse_topic(topic, prefix)?;
        let query = parsed
            .query
            .as_deref()
            .map(|q| parser.parse(q))
            .transpose()?
            .unwrap_or_default();

        if parsed.path.is_collection() {
            if let Some(option) = query.options_besides_select().first() {
                return Err(not_allowed(topic, option));
            }
        } else if let Some(raw) = parsed.query.as_deref() {
            let option = raw.split('=').next().unwrap_or(raw);
            return Err(not_allowed(topic, option));
        }

        let (kind, filter, selected_properties) = match parsed.path {
            ResourcePath::EntitySet(_) => (
                SubscriptionKind::EntitySet,
                None,
                query.select.into_iter().collect(),
            ),
            ResourcePath::RelatedSet {
                parent_id,
                navigation,
                ..
            } => (
                SubscriptionKind::RelatedSet,
                Some(Filter::RelatedIdEquals {
                    navigation,
                    id: parent_id,
                }),
                query.select.into_iter().collect(),
            ),
            ResourcePath::Entity { id, .. } => {
                (SubscriptionKind::Entity, Some(Filter::IdEquals(id)), BTreeSet::new())
            }
            ResourcePath::Property { id, property, .. } => (
                SubscriptionKind::Property,
                Some(Filter::IdEquals(id)),
                BTreeSet::from([property.name().to_owned()]),
            ),
        };

        Ok(Self {
            topic: topic.to_owned(),
            entity_type: parsed.path.entity_type(),
            kind,
            filter,
            selected_properties,
            service_root_url: service_root_url.trim_end_matches('/').to_owned(),
        })
    }

    /// The topic exactly as subscribed.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The entity type this subscription receives.
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The kind of resource watched.
    pub const fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    /// The path-derived filter, if any.
    pub const fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Property names to project onto. Empty means the full entity.
    pub const fn selected_properties(&self) -> &BTreeSet<String> {
        &self.selected_properties
    }

    /// Whether `entity` should be delivered to this subscription.
    ///
    /// The type must match; the filter, if any, must hold. A filter that
    /// cannot be evaluated is a non-match.
    pub fn matches(&self, entity: &Entity, evaluator: &dyn FilterEvaluator) -> bool {
        if entity.entity_type() != self.entity_type {
            return false;
        }
        let Some(filter) = &self.filter else {
            return true;
        };
        match evaluator.evaluate(filter, entity) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "filter evaluation failed, skipping");
                false
            }
        }
    }

    /// Render the payload for `entity`, projected onto the selected
    /// properties. Names the entity type does not have are ignored.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the payload cannot be encoded.
    pub fn format_message(&self, entity: &Entity) -> Result<String, serde_json::Error> {
        let names = self.selected_properties.iter().map(String::as_str);
        let selection = resolve_selection(entity, names);
        serde_json::to_string(&format_entity(entity, &self.service_root_url, &selection))
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.selected_properties == other.selected_properties
    }
}

impl Eq for Subscription {}

impl Hash for Subscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.selected_properties.hash(state);
    }
}

fn not_allowed(topic: &str, option: &str) -> SubscriptionError {
    SubscriptionError::OptionNotAllowed {
        topic: topic.to_owned(),
        option: option.to_owned(),
    }
}

//! The set of live subscriptions.
//!
//! Dispatch workers read a snapshot grouped by entity type; the snapshot is
//! swapped atomically whenever a topic is added or removed, so lookups
//! never wait on a writer. Writers serialize on a mutex over the
//! authoritative topic map.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use sensorwire_types::EntityType;
use tracing::debug;

use crate::subscription::Subscription;

/// Subscriptions of one entity type, as seen by readers.
pub type SubscriptionList = Arc<[Arc<Subscription>]>;

type Snapshot = HashMap<EntityType, SubscriptionList>;

#[derive(Debug)]
struct Entry {
    subscription: Arc<Subscription>,
    subscribers: usize,
}

/// Thread-safe store of active subscriptions keyed by topic.
///
/// Several clients on one topic share a single subscription; the registry
/// counts them and drops the subscription when the last one leaves.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    entries: Mutex<BTreeMap<String, Entry>>,
    snapshot: ArcSwap<Snapshot>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Add a subscriber for `subscription`'s topic.
    ///
    /// Returns `true` when the topic was not registered before. A repeat
    /// registration only bumps the subscriber count.
    pub fn register(&self, subscription: Subscription) -> bool {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(subscription.topic()) {
            entry.subscribers = entry.subscribers.saturating_add(1);
            debug!(
                topic = subscription.topic(),
                subscribers = entry.subscribers,
                "subscriber added to existing topic"
            );
            return false;
        }
        debug!(topic = subscription.topic(), "subscription registered");
        entries.insert(
            subscription.topic().to_owned(),
            Entry {
                subscription: Arc::new(subscription),
                subscribers: 1,
            },
        );
        self.rebuild(&entries);
        true
    }

    /// Drop one subscriber from `topic`.
    ///
    /// Returns `true` when that was the last subscriber and the
    /// subscription is gone. Unknown topics are ignored.
    pub fn unregister(&self, topic: &str) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(topic) else {
            return false;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return false;
        }
        entries.remove(topic);
        debug!(topic, "subscription removed");
        self.rebuild(&entries);
        true
    }

    /// Every subscription receiving entities of `entity_type`.
    pub fn for_type(&self, entity_type: EntityType) -> SubscriptionList {
        self.snapshot
            .load()
            .get(&entity_type)
            .map_or_else(|| Arc::from(Vec::new()), Arc::clone)
    }

    /// The subscription registered under `topic`.
    pub fn get(&self, topic: &str) -> Option<Arc<Subscription>> {
        self.entries
            .lock()
            .get(topic)
            .map(|entry| Arc::clone(&entry.subscription))
    }

    /// How many clients share `topic`. Zero when it is not registered.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.entries
            .lock()
            .get(topic)
            .map_or(0, |entry| entry.subscribers)
    }

    /// Number of distinct topics.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no topic is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn rebuild(&self, entries: &BTreeMap<String, Entry>) {
        let mut grouped: HashMap<EntityType, Vec<Arc<Subscription>>> = HashMap::new();
        for entry in entries.values() {
            grouped
                .entry(entry.subscription.entity_type())
                .or_default()
                .push(Arc::clone(&entry.subscription));
        }
        let snapshot: Snapshot = grouped
            .into_iter()
            .map(|(entity_type, list)| (entity_type, Arc::from(list)))
            .collect();
        self.snapshot.store(Arc::new(snapshot));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::SystemQueryParser;

    fn subscription(topic: &str) -> Subscription {
        Subscription::from_topic(topic, "v1.0/", "http://localhost/v1.0", &SystemQueryParser)
            .unwrap()
    }

    #[test]
    fn lookup_is_scoped_by_type() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.register(subscription("v1.0/Things")));
        assert!(registry.register(subscription("v1.0/Observations")));
        assert!(registry.register(subscription("v1.0/Datastreams(7)/Observations")));

        assert_eq!(registry.for_type(EntityType::Observation).len(), 2);
        assert_eq!(registry.for_type(EntityType::Thing).len(), 1);
        assert!(registry.for_type(EntityType::Sensor).is_empty());
    }

    #[test]
    fn shared_topic_is_counted() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.register(subscription("v1.0/Things")));
        assert!(!registry.register(subscription("v1.0/Things")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.subscriber_count("v1.0/Things"), 2);

        assert!(!registry.unregister("v1.0/Things"));
        assert_eq!(registry.for_type(EntityType::Thing).len(), 1);
        assert!(registry.unregister("v1.0/Things"));
        assert!(registry.is_empty());
        assert!(registry.for_type(EntityType::Thing).is_empty());
    }

    #[test]
    fn unknown_topic_unregister_is_ignored() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.unregister("v1.0/Things"));
        assert!(registry.get("v1.0/Things").is_none());
    }

    #[test]
    fn snapshot_outlives_removal() {
        let registry = SubscriptionRegistry::new();
        registry.register(subscription("v1.0/Sensors"));
        let held = registry.for_type(EntityType::Sensor);
        registry.unregister("v1.0/Sensors");
        assert_eq!(held.len(), 1);
        assert!(registry.for_type(EntityType::Sensor).is_empty());
    }
}

//! Integration tests for subscription construction and the registry.
//!
//! Covers topic acceptance rules, projection of payloads, and concurrent
//! registration against lookups from several tasks.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use sensorwire_core::{
    BuiltinEvaluator, NotifierConfig, Subscription, SubscriptionError, SubscriptionKind,
    SubscriptionRegistry, SystemQueryParser,
};
use sensorwire_types::{
    Attribute, Entity, EntityId, EntityType, Number, Property, Related, ResultValue,
};
use serde_json::{Value, json};

fn subscribe(config: &NotifierConfig, topic: &str) -> Result<Subscription, SubscriptionError> {
    Subscription::from_topic(
        topic,
        &config.topic_prefix(),
        &config.service_root(),
        &SystemQueryParser,
    )
}

fn observation(id: i64, datastream: i64) -> Entity {
    Entity::new(EntityType::Observation)
        .with_id(EntityId::new(id))
        .with(
            Property::Result,
            Attribute::Result(ResultValue::Number(Number::Exact(dec!(21.5)))),
        )
        .with(
            Property::Datastream,
            Attribute::Related(Related::reference(
                EntityType::Datastream,
                EntityId::new(datastream),
            )),
        )
}

#[test]
fn collection_topic_rejects_everything_but_select() {
    let config = NotifierConfig::default();
    for option in ["$filter=id eq 1", "$expand=Datastream", "$orderby=id", "$top=1", "$skip=1"] {
        let topic = format!("v1.0/Observations?{option}");
        let err = subscribe(&config, &topic).unwrap_err();
        assert!(
            matches!(err, SubscriptionError::OptionNotAllowed { .. }),
            "{topic}: {err}"
        );
    }
    assert!(matches!(
        subscribe(&config, "v1.0/Observations?$count=true"),
        Err(SubscriptionError::OptionNotAllowed { .. })
    ));
    assert!(matches!(
        subscribe(&config, "v1.0/Observations?$bogus=1"),
        Err(SubscriptionError::Query { .. })
    ));
}

#[test]
fn select_yields_only_named_properties() {
    let config = NotifierConfig::default();
    let sub = subscribe(&config, "v1.0/Things?$select=name,description").unwrap();
    let thing = Entity::new(EntityType::Thing)
        .with_id(EntityId::new(3))
        .with(Property::Name, Attribute::Text("kiln".to_owned()))
        .with(Property::Description, Attribute::Text("gas kiln".to_owned()))
        .with(
            Property::Properties,
            Attribute::Object(serde_json::Map::new()),
        );

    let payload: Value = serde_json::from_str(&sub.format_message(&thing).unwrap()).unwrap();
    assert_eq!(payload, json!({"name": "kiln", "description": "gas kiln"}));
}

#[test]
fn related_collection_topic_matches_parent_only() {
    let config = NotifierConfig::default();
    let sub = subscribe(&config, "v1.0/Datastreams(7)/Observations").unwrap();
    assert_eq!(sub.kind(), SubscriptionKind::RelatedSet);
    assert!(sub.matches(&observation(1, 7), &BuiltinEvaluator));
    assert!(!sub.matches(&observation(2, 8), &BuiltinEvaluator));

    let payload: Value =
        serde_json::from_str(&sub.format_message(&observation(1, 7)).unwrap()).unwrap();
    assert_eq!(payload["result"], json!(21.5));
    assert_eq!(
        payload["Datastream@iot.navigationLink"],
        json!("http://localhost:8080/sensorwire/v1.0/Observations(1)/Datastream")
    );
}

#[test]
fn missing_prefix_is_invalid() {
    let config = NotifierConfig::default();
    assert!(matches!(
        subscribe(&config, "Observations"),
        Err(SubscriptionError::InvalidTopic { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_and_lookup() {
    let config = NotifierConfig::default();
    let registry = Arc::new(SubscriptionRegistry::new());
    let mut handles = Vec::new();

    for task in 0..8_i64 {
        let registry = Arc::clone(&registry);
        let sub = subscribe(&config, &format!("v1.0/Datastreams({task})/Observations")).unwrap();
        handles.push(tokio::spawn(async move {
            registry.register(sub);
            for _ in 0..100 {
                let seen = registry.for_type(EntityType::Observation);
                assert!(!seen.is_empty());
                assert!(seen.iter().all(|s| s.entity_type() == EntityType::Observation));
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.len(), 8);
    let matched = registry
        .for_type(EntityType::Observation)
        .iter()
        .filter(|s| s.matches(&observation(1, 3), &BuiltinEvaluator))
        .count();
    assert_eq!(matched, 1);
}

//! Integration tests for the dispatcher.
//!
//! Uses in-memory publishers: one that records every payload, and one that
//! parks inside `publish` until the test releases it, to observe queue
//! backpressure.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal_macros::dec;
use sensorwire_codec::{CellValue, Row};
use sensorwire_core::{
    BuiltinEvaluator, Filter, FilterError, FilterEvaluator, Subscription, SubscriptionRegistry,
    SystemQueryParser,
};
use sensorwire_dispatch::{
    ChangeEvent, DispatchError, DispatchSettings, Dispatcher, DropReason, EventClass,
    EventOutcome, Pipeline, PublishError, Publisher, QueueSettings,
};
use sensorwire_types::{Attribute, Entity, EntityId, EntityType, Number, Property, ResultValue};
use serde_json::{Value, json};
use tokio::sync::{Semaphore, mpsc};

const ROOT: &str = "http://localhost:8080/sensorwire/v1.0";

#[derive(Debug, Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        self.sent.lock().push((topic.to_owned(), payload));
        Ok(())
    }
}

/// Fails for one topic, records the rest.
#[derive(Debug, Default)]
struct FlakyPublisher {
    inner: RecordingPublisher,
}

impl Publisher for FlakyPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        if topic.contains("$select") {
            return Err(PublishError {
                topic: topic.to_owned(),
                message: "broker unavailable".to_owned(),
            });
        }
        self.inner.publish(topic, payload).await
    }
}

/// Cannot evaluate id filters; defers everything else to the builtin rules.
#[derive(Debug, Default)]
struct IdBlindEvaluator;

impl FilterEvaluator for IdBlindEvaluator {
    fn evaluate(&self, filter: &Filter, entity: &Entity) -> Result<bool, FilterError> {
        match filter {
            Filter::IdEquals(_) => Err(FilterError::MissingIdentity {
                entity_type: entity.entity_type(),
            }),
            Filter::RelatedIdEquals { .. } => BuiltinEvaluator.evaluate(filter, entity),
        }
    }
}

/// Panics for one topic, records the rest.
#[derive(Debug, Default)]
struct PanickingPublisher {
    inner: RecordingPublisher,
}

impl Publisher for PanickingPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        assert!(!topic.contains("Sensors"), "publisher blew up on {topic}");
        self.inner.publish(topic, payload).await
    }
}

/// Signals entry, then waits for a permit before returning.
#[derive(Debug)]
struct GatedPublisher {
    entered: mpsc::UnboundedSender<()>,
    gate: Semaphore,
}

impl Publisher for GatedPublisher {
    async fn publish(&self, _topic: &str, _payload: String) -> Result<(), PublishError> {
        let _ = self.entered.send(());
        self.gate.acquire().await.unwrap().forget();
        Ok(())
    }
}

fn registry(topics: &[&str]) -> Arc<SubscriptionRegistry> {
    let registry = Arc::new(SubscriptionRegistry::new());
    for topic in topics {
        let sub = Subscription::from_topic(topic, "v1.0/", ROOT, &SystemQueryParser).unwrap();
        registry.register(sub);
    }
    registry
}

fn pipeline<P: Publisher>(registry: Arc<SubscriptionRegistry>, publisher: Arc<P>) -> Pipeline<P> {
    Pipeline::new(registry, Arc::new(BuiltinEvaluator), publisher)
}

fn thing(id: i64) -> Entity {
    Entity::new(EntityType::Thing)
        .with_id(EntityId::new(id))
        .with(Property::Name, Attribute::Text("kiln".to_owned()))
        .with(Property::Description, Attribute::Text("gas kiln".to_owned()))
}

fn single_worker(queue_size: usize) -> DispatchSettings {
    let queue = QueueSettings {
        queue_size,
        pool_size: 1,
    };
    DispatchSettings {
        create: queue,
        update: queue,
    }
}

#[tokio::test]
async fn projected_and_full_subscriptions_get_one_payload_each() {
    let publisher = Arc::new(RecordingPublisher::default());
    let registry = registry(&["v1.0/Things", "v1.0/Things?$select=name", "v1.0/Sensors"]);
    let pipeline = pipeline(registry, Arc::clone(&publisher));

    let outcome = pipeline.process(ChangeEvent::created(thing(5))).await;
    assert!(matches!(
        outcome,
        EventOutcome::Published {
            delivered: 2,
            failed: 0
        }
    ));

    let mut sent = publisher.sent();
    sent.sort();
    assert_eq!(sent.len(), 2);
    let full: Value = serde_json::from_str(&sent[0].1).unwrap();
    let projected: Value = serde_json::from_str(&sent[1].1).unwrap();
    assert_eq!(sent[0].0, "v1.0/Things");
    assert_eq!(full["@iot.id"], json!(5));
    assert_eq!(full["description"], json!("gas kiln"));
    assert_eq!(sent[1].0, "v1.0/Things?$select=name");
    assert_eq!(projected, json!({"name": "kiln"}));
}

#[tokio::test]
async fn rows_are_materialized_before_matching() {
    let publisher = Arc::new(RecordingPublisher::default());
    let registry = registry(&["v1.0/Datastreams(7)/Observations"]);
    let pipeline = pipeline(registry, Arc::clone(&publisher));

    let row = Row::new()
        .with("id", 42_i64)
        .with("result_type", 0_i64)
        .with("result_string", "21.5")
        .with("result_number", 21.5_f64)
        .with("datastream_id", 7_i64);
    let outcome = pipeline
        .process(ChangeEvent::row(EventClass::Create, EntityType::Observation, row))
        .await;
    assert_eq!(outcome.delivered(), 1);

    let sent = publisher.sent();
    let payload: Value = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(payload["@iot.id"], json!(42));
    assert_eq!(payload["result"], json!(21.5));

    let other = Entity::new(EntityType::Observation)
        .with_id(EntityId::new(43))
        .with(
            Property::Result,
            Attribute::Result(ResultValue::Number(Number::Exact(dec!(1)))),
        );
    let outcome = pipeline.process(ChangeEvent::updated(other)).await;
    assert!(matches!(outcome, EventOutcome::Dropped(DropReason::NoMatch)));
}

#[tokio::test]
async fn corrupt_row_is_dropped() {
    let publisher = Arc::new(RecordingPublisher::default());
    let pipeline = pipeline(registry(&["v1.0/Things"]), Arc::clone(&publisher));

    let row = Row::new()
        .with("id", 1_i64)
        .with("properties", CellValue::Text("{not json".to_owned()));
    let outcome = pipeline
        .process(ChangeEvent::row(EventClass::Create, EntityType::Thing, row))
        .await;
    assert!(matches!(outcome, EventOutcome::Dropped(DropReason::Codec(_))));
    assert!(publisher.sent().is_empty());
    assert_eq!(pipeline.stats().snapshot().dropped, 1);
}

#[tokio::test]
async fn publish_failure_does_not_affect_other_subscriptions() {
    let publisher = Arc::new(FlakyPublisher::default());
    let registry = registry(&["v1.0/Things", "v1.0/Things?$select=name"]);
    let pipeline = pipeline(registry, Arc::clone(&publisher));

    let outcome = pipeline.process(ChangeEvent::created(thing(1))).await;
    assert!(matches!(
        outcome,
        EventOutcome::Published {
            delivered: 1,
            failed: 1
        }
    ));
    assert_eq!(publisher.inner.sent().len(), 1);
}

#[tokio::test]
async fn filter_error_skips_only_that_subscription() {
    let publisher = Arc::new(RecordingPublisher::default());
    let registry = registry(&[
        "v1.0/Observations",
        "v1.0/Observations(42)",
        "v1.0/Datastreams(7)/Observations",
    ]);
    let pipeline = Pipeline::new(registry, Arc::new(IdBlindEvaluator), Arc::clone(&publisher));

    let row = Row::new()
        .with("id", 42_i64)
        .with("result_type", 3_i64)
        .with("result_string", "ok")
        .with("datastream_id", 7_i64);
    let outcome = pipeline
        .process(ChangeEvent::row(EventClass::Update, EntityType::Observation, row))
        .await;
    assert!(matches!(
        outcome,
        EventOutcome::Published {
            delivered: 2,
            failed: 0
        }
    ));

    let mut topics: Vec<String> = publisher.sent().into_iter().map(|(t, _)| t).collect();
    topics.sort();
    assert_eq!(
        topics,
        vec![
            "v1.0/Datastreams(7)/Observations".to_owned(),
            "v1.0/Observations".to_owned(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_queue_blocks_producer_until_worker_drains() {
    let (entered_tx, mut entered) = mpsc::unbounded_channel();
    let publisher = Arc::new(GatedPublisher {
        entered: entered_tx,
        gate: Semaphore::new(0),
    });
    let registry = registry(&["v1.0/Things"]);
    let dispatcher =
        Dispatcher::start(single_worker(1), pipeline(registry, Arc::clone(&publisher))).unwrap();

    // The worker takes the first event and parks in publish.
    dispatcher.enqueue(ChangeEvent::created(thing(1))).await.unwrap();
    entered.recv().await.unwrap();

    // The second fills the only slot.
    dispatcher.enqueue(ChangeEvent::created(thing(2))).await.unwrap();
    assert_eq!(dispatcher.queued(EventClass::Create), 1);
    assert!(matches!(
        dispatcher.try_enqueue(ChangeEvent::created(thing(3))),
        Err(DispatchError::QueueFull {
            class: EventClass::Create
        })
    ));
    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        dispatcher.enqueue(ChangeEvent::created(thing(3))),
    )
    .await;
    assert!(blocked.is_err(), "producer should wait while the queue is full");

    // Update events have their own queue.
    dispatcher.try_enqueue(ChangeEvent::updated(thing(9))).unwrap();

    publisher.gate.add_permits(10);
    tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.enqueue(ChangeEvent::created(thing(3))),
    )
    .await
    .unwrap()
    .unwrap();

    dispatcher.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_drains_queued_events() {
    let publisher = Arc::new(RecordingPublisher::default());
    let registry = registry(&["v1.0/Things"]);
    let settings = DispatchSettings {
        create: QueueSettings {
            queue_size: 16,
            pool_size: 3,
        },
        update: QueueSettings {
            queue_size: 16,
            pool_size: 2,
        },
    };
    let dispatcher =
        Dispatcher::start(settings, pipeline(registry, Arc::clone(&publisher))).unwrap();

    for id in 0..10 {
        dispatcher.enqueue(ChangeEvent::created(thing(id))).await.unwrap();
        dispatcher.enqueue(ChangeEvent::updated(thing(id))).await.unwrap();
    }
    let stats = dispatcher.stats();
    assert_eq!(stats.accepted, 20);
    dispatcher.shutdown().await;

    assert_eq!(publisher.sent().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_publisher_costs_one_event_not_the_worker() {
    let publisher = Arc::new(PanickingPublisher::default());
    let registry = registry(&["v1.0/Things", "v1.0/Sensors"]);
    let pipeline = pipeline(registry, Arc::clone(&publisher));
    let stats = pipeline.stats();
    let dispatcher = Dispatcher::start(single_worker(4), pipeline).unwrap();

    let sensor = Entity::new(EntityType::Sensor).with_id(EntityId::new(9));
    dispatcher.enqueue(ChangeEvent::created(sensor)).await.unwrap();
    dispatcher.enqueue(ChangeEvent::created(thing(1))).await.unwrap();
    dispatcher.enqueue(ChangeEvent::created(thing(2))).await.unwrap();
    dispatcher.shutdown().await;

    assert_eq!(publisher.inner.sent().len(), 2);
    let totals = stats.snapshot();
    assert_eq!(totals.dropped, 1);
    assert_eq!(totals.published, 2);
}

#[tokio::test]
async fn invalid_settings_are_rejected_at_start() {
    let publisher = Arc::new(RecordingPublisher::default());
    let result = Dispatcher::start(single_worker(0), pipeline(registry(&[]), publisher));
    assert!(matches!(result, Err(DispatchError::InvalidSettings { .. })));
}

//! Bounded queues and the worker pools that drain them.
//!
//! Create and update events each get their own queue and pool, sized
//! independently. Producers either wait for a free slot
//! ([`Dispatcher::enqueue`]) or are turned away
//! ([`Dispatcher::try_enqueue`]). Workers of one pool share the queue
//! receiver and take events in arrival order; there is no ordering across
//! workers.
//!
//! Each event is processed in its own task. A publisher or evaluator that
//! panics loses that one event (counted as dropped and logged at `error`);
//! the worker keeps draining its queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sensorwire_codec::materialize;
use sensorwire_core::config::DispatchConfig;
use sensorwire_core::{FilterEvaluator, SubscriptionRegistry};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::DispatchError;
use crate::event::{
    ChangeEvent, DispatchStage, DropReason, EventClass, EventOutcome, EventPayload,
};
use crate::publisher::Publisher;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Depth and worker count for one event class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Events that may wait in the queue.
    pub queue_size: usize,
    /// Workers draining the queue.
    pub pool_size: usize,
}

/// Queue settings for both event classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Create-class events.
    pub create: QueueSettings,
    /// Update-class events.
    pub update: QueueSettings,
}

impl DispatchSettings {
    /// Take the sizes from the `dispatch` config section.
    pub const fn from_config(config: &DispatchConfig) -> Self {
        Self {
            create: QueueSettings {
                queue_size: config.create_queue_size,
                pool_size: config.create_pool_size,
            },
            update: QueueSettings {
                queue_size: config.update_queue_size,
                pool_size: config.update_pool_size,
            },
        }
    }

    /// Every queue and pool must hold at least one.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSettings`] naming the offending size.
    pub fn validate(self) -> Result<(), DispatchError> {
        let queues = [
            (EventClass::Create, self.create),
            (EventClass::Update, self.update),
        ];
        for (class, queue) in queues {
            if queue.queue_size < 1 {
                return Err(DispatchError::InvalidSettings {
                    message: format!("{class} queue size must be at least 1"),
                });
            }
            if queue.pool_size < 1 {
                return Err(DispatchError::InvalidSettings {
                    message: format!("{class} pool size must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Running totals, updated by producers and workers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    accepted: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events admitted to a queue.
    pub accepted: u64,
    /// Payloads the publisher accepted.
    pub published: u64,
    /// Payloads that could not be formatted or published.
    pub failed: u64,
    /// Events that produced no payload at all.
    pub dropped: u64,
}

impl DispatchStats {
    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &EventOutcome) {
        match outcome {
            EventOutcome::Published { delivered, failed } => {
                self.published
                    .fetch_add(u64::try_from(*delivered).unwrap_or(u64::MAX), Ordering::Relaxed);
                self.failed
                    .fetch_add(u64::try_from(*failed).unwrap_or(u64::MAX), Ordering::Relaxed);
            }
            EventOutcome::Dropped(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Processing of a single event, shared by all workers.
pub struct Pipeline<P> {
    registry: Arc<SubscriptionRegistry>,
    evaluator: Arc<dyn FilterEvaluator>,
    publisher: Arc<P>,
    stats: Arc<DispatchStats>,
}

impl<P: Publisher> Pipeline<P> {
    /// Build a pipeline over the live registry.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        evaluator: Arc<dyn FilterEvaluator>,
        publisher: Arc<P>,
    ) -> Self {
        Self {
            registry,
            evaluator,
            publisher,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Counters for events processed by this pipeline.
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Materialize, match, format, and publish one event.
    ///
    /// The publisher is called once per matching subscription. A payload
    /// that fails to format or publish is logged and counted; the other
    /// subscriptions still receive theirs.
    pub async fn process(&self, event: ChangeEvent) -> EventOutcome {
        let event_id = event.id;
        trace!(event_id = %event_id, stage = ?DispatchStage::Materializing, "processing event");
        let entity = match event.payload {
            EventPayload::Entity(entity) => entity,
            EventPayload::Row { entity_type, row } => match materialize(&row, entity_type) {
                Ok(entity) => entity,
                Err(e) => {
                    error!(
                        event_id = %event_id,
                        entity_type = %entity_type,
                        error = %e,
                        "dropping event, row could not be materialized"
                    );
                    return self.finish(EventOutcome::Dropped(DropReason::Codec(e)));
                }
            },
        };

        trace!(event_id = %event_id, stage = ?DispatchStage::Matching, "processing event");
        let candidates = self.registry.for_type(entity.entity_type());
        let matched: Vec<_> = candidates
            .iter()
            .filter(|sub| sub.matches(&entity, self.evaluator.as_ref()))
            .collect();
        if matched.is_empty() {
            debug!(
                event_id = %event_id,
                entity_type = %entity.entity_type(),
                candidates = candidates.len(),
                "no subscription matched"
            );
            return self.finish(EventOutcome::Dropped(DropReason::NoMatch));
        }

        trace!(event_id = %event_id, stage = ?DispatchStage::Formatting, "processing event");
        let mut delivered: usize = 0;
        let mut failed: usize = 0;
        for sub in matched {
            let payload = match sub.format_message(&entity) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(topic = sub.topic(), error = %e, "failed to format payload");
                    failed = failed.saturating_add(1);
                    continue;
                }
            };
            match self.publisher.publish(sub.topic(), payload).await {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(topic = sub.topic(), error = %e, "failed to publish payload");
                    failed = failed.saturating_add(1);
                }
            }
        }
        debug!(event_id = %event_id, delivered, failed, "event dispatched");
        self.finish(EventOutcome::Published { delivered, failed })
    }

    fn finish(&self, outcome: EventOutcome) -> EventOutcome {
        self.stats.record(&outcome);
        outcome
    }
}

impl<P> std::fmt::Debug for Pipeline<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("subscriptions", &self.registry.len())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owns the queues and worker tasks. Must be started inside a tokio
/// runtime.
#[derive(Debug)]
pub struct Dispatcher {
    create_tx: mpsc::Sender<ChangeEvent>,
    update_tx: mpsc::Sender<ChangeEvent>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Validate `settings` and spawn both worker pools.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSettings`] for a zero queue depth or
    /// pool size.
    pub fn start<P: Publisher>(
        settings: DispatchSettings,
        pipeline: Pipeline<P>,
    ) -> Result<Self, DispatchError> {
        settings.validate()?;
        let stats = pipeline.stats();
        let pipeline = Arc::new(pipeline);
        let (create_tx, mut workers) = spawn_pool(EventClass::Create, settings.create, &pipeline);
        let (update_tx, update_workers) =
            spawn_pool(EventClass::Update, settings.update, &pipeline);
        workers.extend(update_workers);
        info!(
            create_queue = settings.create.queue_size,
            create_workers = settings.create.pool_size,
            update_queue = settings.update.queue_size,
            update_workers = settings.update.pool_size,
            "dispatcher started"
        );
        Ok(Self {
            create_tx,
            update_tx,
            workers,
            stats,
        })
    }

    /// Admit `event`, waiting while its queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the workers are gone.
    pub async fn enqueue(&self, event: ChangeEvent) -> Result<(), DispatchError> {
        let class = event.class;
        let event_id = event.id;
        self.sender(class)
            .send(event)
            .await
            .map_err(|_closed| DispatchError::Closed { class })?;
        self.accepted(class, event_id);
        Ok(())
    }

    /// Admit `event` only if its queue has a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::QueueFull`] when there is no room and
    /// [`DispatchError::Closed`] if the workers are gone.
    pub fn try_enqueue(&self, event: ChangeEvent) -> Result<(), DispatchError> {
        let class = event.class;
        let event_id = event.id;
        match self.sender(class).try_send(event) {
            Ok(()) => {
                self.accepted(class, event_id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                debug!(%class, event_id = %event_id, "queue full, event rejected");
                Err(DispatchError::QueueFull { class })
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed { class }),
        }
    }

    /// Events currently waiting in the queue for `class`.
    pub fn queued(&self, class: EventClass) -> usize {
        let sender = self.sender(class);
        sender.max_capacity().saturating_sub(sender.capacity())
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Close both queues, let the workers drain what is queued, and wait
    /// for them to exit.
    pub async fn shutdown(self) {
        let Self {
            create_tx,
            update_tx,
            workers,
            stats,
        } = self;
        drop(create_tx);
        drop(update_tx);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "dispatch worker ended abnormally");
            }
        }
        let totals = stats.snapshot();
        info!(
            accepted = totals.accepted,
            published = totals.published,
            failed = totals.failed,
            dropped = totals.dropped,
            "dispatcher stopped"
        );
    }

    const fn sender(&self, class: EventClass) -> &mpsc::Sender<ChangeEvent> {
        match class {
            EventClass::Create => &self.create_tx,
            EventClass::Update => &self.update_tx,
        }
    }

    fn accepted(&self, class: EventClass, event_id: uuid::Uuid) {
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        trace!(%class, event_id = %event_id, stage = ?DispatchStage::Queued, "event queued");
    }
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<ChangeEvent>>>;

fn spawn_pool<P: Publisher>(
    class: EventClass,
    settings: QueueSettings,
    pipeline: &Arc<Pipeline<P>>,
) -> (mpsc::Sender<ChangeEvent>, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel(settings.queue_size);
    let rx: SharedReceiver = Arc::new(Mutex::new(rx));
    let workers = (0..settings.pool_size)
        .map(|worker| {
            tokio::spawn(run_worker(
                class,
                worker,
                Arc::clone(&rx),
                Arc::clone(pipeline),
            ))
        })
        .collect();
    (tx, workers)
}

async fn run_worker<P: Publisher>(
    class: EventClass,
    worker: usize,
    rx: SharedReceiver,
    pipeline: Arc<Pipeline<P>>,
) {
    debug!(%class, worker, "dispatch worker started");
    loop {
        let next = rx.lock().await.recv().await;
        let Some(event) = next else {
            break;
        };
        let event_id = event.id;
        let task = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.process(event).await }
        });
        match task.await {
            Ok(outcome) => trace!(%class, worker, outcome = ?outcome, "event finished"),
            Err(e) => {
                pipeline.stats.dropped.fetch_add(1, Ordering::Relaxed);
                error!(
                    %class,
                    worker,
                    event_id = %event_id,
                    error = %e,
                    "event processing aborted, worker continues"
                );
            }
        }
    }
    debug!(%class, worker, "dispatch worker stopped");
}

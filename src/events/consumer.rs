// events/consumer.rs
//
// Event Consumer - Recommendation Log
//
// Runs as its own process (see main.rs). Pulls from two durable queues and
// applies the recommendation-log handlers.
//
// DELIVERY CONTRACT:
// 1. Handler Ok            -> ack
// 2. Handler Err / panic   -> nack, broker redelivers after the configured delay
// 3. Undecodable payload   -> logged and acked (redelivery cannot fix it)
//
// Handlers run concurrently, bounded by max_in_flight. No ordering between
// messages is assumed. Shutdown stops pulling and waits for in-flight handlers.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use super::broker::{Delivery, MessageBroker, Subscription};
use super::handlers::RecommendationLogHandler;
use super::types::{EpisodeCompleted, ReviewCreated, EPISODE_COMPLETED_TOPIC, REVIEW_CREATED_TOPIC};
use crate::config::ConsumerConfig;
use crate::error::AppResult;

/// Which event a queue carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    EpisodeCompleted,
    ReviewCreated,
}

impl EventKind {
    fn topic(self) -> &'static str {
        match self {
            EventKind::EpisodeCompleted => EPISODE_COMPLETED_TOPIC,
            EventKind::ReviewCreated => REVIEW_CREATED_TOPIC,
        }
    }
}

enum Dispatch {
    Applied(usize),
    Malformed(serde_json::Error),
}

pub struct EventConsumer {
    broker: Arc<dyn MessageBroker>,
    handler: Arc<RecommendationLogHandler>,
    config: ConsumerConfig,
}

impl EventConsumer {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        handler: Arc<RecommendationLogHandler>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            broker,
            handler,
            config,
        }
    }

    /// Bind the consumer's queues to their topics. Idempotent.
    ///
    /// Publishers call this too, so that events emitted before the consumer
    /// first starts are already queued for it.
    pub fn declare_queues(broker: &dyn MessageBroker, config: &ConsumerConfig) -> AppResult<()> {
        broker.declare_queue(EPISODE_COMPLETED_TOPIC, &config.episode_completed_queue)?;
        broker.declare_queue(REVIEW_CREATED_TOPIC, &config.review_created_queue)?;
        Ok(())
    }

    /// Consume until `shutdown` turns true (or its sender is dropped).
    ///
    /// Fails only at startup, when the queues cannot be declared or
    /// subscribed. Later broker errors are logged and retried.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        // 1. Startup: any broker failure here is fatal to the caller
        Self::declare_queues(self.broker.as_ref(), &self.config)?;
        let episode_sub = self
            .broker
            .subscribe(EPISODE_COMPLETED_TOPIC, &self.config.episode_completed_queue)
            .await?;
        let review_sub = self
            .broker
            .subscribe(REVIEW_CREATED_TOPIC, &self.config.review_created_queue)
            .await?;

        info!(
            "[CONSUMER] Subscribed to '{}' and '{}' (max_in_flight={})",
            self.config.episode_completed_queue,
            self.config.review_created_queue,
            self.config.max_in_flight
        );

        // 2. One pull loop per queue, sharing the in-flight budget
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut loops = JoinSet::new();
        for (subscription, kind) in [
            (episode_sub, EventKind::EpisodeCompleted),
            (review_sub, EventKind::ReviewCreated),
        ] {
            loops.spawn(pull_loop(
                subscription,
                kind,
                Arc::clone(&self.handler),
                Arc::clone(&permits),
                self.config.redelivery_delay,
                shutdown.clone(),
            ));
        }

        // 3. Loops return only after draining their own handlers
        while let Some(result) = loops.join_next().await {
            if let Err(e) = result {
                error!("[CONSUMER] Pull loop terminated abnormally: {}", e);
            }
        }

        info!("[CONSUMER] Stopped");
        Ok(())
    }
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

async fn pull_loop(
    mut subscription: Box<dyn Subscription>,
    kind: EventKind,
    handler: Arc<RecommendationLogHandler>,
    permits: Arc<Semaphore>,
    redelivery_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut in_flight = JoinSet::new();

    loop {
        if shutdown_requested(&shutdown) {
            break;
        }

        let permit = tokio::select! {
            _ = shutdown.changed() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        // A claim interrupted by shutdown is never lost: in-memory claims are
        // atomic with their return, durable ones stay leased until they expire.
        let delivery = tokio::select! {
            _ = shutdown.changed() => break,
            next = subscription.next() => next,
        };

        match delivery {
            Ok(delivery) => {
                in_flight.spawn(process(
                    delivery,
                    kind,
                    Arc::clone(&handler),
                    redelivery_delay,
                    permit,
                ));
            }
            Err(e) => {
                warn!(
                    "[CONSUMER] Pull from {} failed: {}, retrying in {:?}",
                    kind.topic(),
                    e,
                    redelivery_delay
                );
                drop(permit);
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(redelivery_delay) => {}
                }
            }
        }

        while let Some(result) = in_flight.try_join_next() {
            if let Err(e) = result {
                error!("[CONSUMER] Delivery task failed: {}", e);
            }
        }
    }

    if !in_flight.is_empty() {
        info!(
            "[CONSUMER] Draining {} in-flight {} handlers",
            in_flight.len(),
            kind.topic()
        );
    }
    while let Some(result) = in_flight.join_next().await {
        if let Err(e) = result {
            error!("[CONSUMER] Delivery task failed: {}", e);
        }
    }
}

async fn process(
    delivery: Delivery,
    kind: EventKind,
    handler: Arc<RecommendationLogHandler>,
    redelivery_delay: Duration,
    _permit: OwnedSemaphorePermit,
) {
    let payload = delivery.payload.clone();

    // Separate task so a panicking handler surfaces as a JoinError
    let outcome = tokio::spawn(async move { dispatch(&handler, kind, &payload).await }).await;

    let settled = match outcome {
        Ok(Ok(Dispatch::Applied(flipped))) => {
            debug!(
                "[CONSUMER] {} message {} (attempt {}) applied, {} rows flipped",
                kind.topic(),
                delivery.message_id(),
                delivery.attempt,
                flipped
            );
            delivery.ack().await
        }
        Ok(Ok(Dispatch::Malformed(e))) => {
            warn!(
                "[CONSUMER] Dropping undecodable {} message {}: {}",
                kind.topic(),
                delivery.message_id(),
                e
            );
            delivery.ack().await
        }
        Ok(Err(e)) => {
            warn!(
                "[CONSUMER] Handler for {} message {} failed (attempt {}): {}",
                kind.topic(),
                delivery.message_id(),
                delivery.attempt,
                e
            );
            delivery.nack(redelivery_delay).await
        }
        Err(e) => {
            error!(
                "[CONSUMER] Handler for {} message {} panicked: {}",
                kind.topic(),
                delivery.message_id(),
                e
            );
            delivery.nack(redelivery_delay).await
        }
    };

    if let Err(e) = settled {
        error!("[CONSUMER] Could not settle {} message: {}", kind.topic(), e);
    }
}

async fn dispatch(
    handler: &RecommendationLogHandler,
    kind: EventKind,
    payload: &[u8],
) -> AppResult<Dispatch> {
    let flipped = match kind {
        EventKind::EpisodeCompleted => match serde_json::from_slice::<EpisodeCompleted>(payload) {
            Ok(event) => handler.handle_episode_completed(&event).await?,
            Err(e) => return Ok(Dispatch::Malformed(e)),
        },
        EventKind::ReviewCreated => match serde_json::from_slice::<ReviewCreated>(payload) {
            Ok(event) => handler.handle_review_created(&event).await?,
            Err(e) => return Ok(Dispatch::Malformed(e)),
        },
    };
    Ok(Dispatch::Applied(flipped))
}

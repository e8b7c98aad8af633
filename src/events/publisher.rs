// events/publisher.rs
//
// Outbound side of the event system.
//
// CRITICAL RULES:
// - Only the write gateways (WatchService, ReviewService) publish
// - Publish happens after the database commit, never inside it
// - A failed publish is an error for the caller; the write is already
//   committed and the call can be retried because consumers are idempotent

use log::info;
use std::sync::Arc;

use super::broker::MessageBroker;
use super::types::DomainEvent;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct EventPublisher {
    broker: Arc<dyn MessageBroker>,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    pub fn publish<E: DomainEvent>(&self, event: &E) -> AppResult<()> {
        let payload = serde_json::to_vec(event)?;
        let queues = self.broker.publish(event.topic(), payload).map_err(|e| match e {
            AppError::Broker(_) => e,
            other => AppError::Broker(format!(
                "Failed to publish {} {}: {}",
                event.event_type(),
                event.event_id(),
                other
            )),
        })?;

        info!(
            "[EVENT] {} (id: {}) | {} -> {} queues",
            event.event_type(),
            event.event_id(),
            event.topic(),
            queues
        );
        Ok(())
    }
}

// events/broker/memory.rs
//
// In-process broker. Same queue semantics as the durable broker but nothing
// survives the process. Used by tests and single-process embedding.

use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{Acknowledger, Delivery, MessageBroker, MessageId, Subscription};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    topic: String,
    payload: Vec<u8>,
    attempts: u32,
    available_at: Instant,
}

struct QueueState {
    topic: String,
    pending: VecDeque<StoredMessage>,
    in_flight: HashMap<MessageId, StoredMessage>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct BrokerState {
    next_id: MessageId,
    queues: HashMap<String, QueueState>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<BrokerState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn requeue(&self, queue: &str, message_id: MessageId, available_at: Instant) -> bool {
        let mut state = self.lock();
        let Some(queue_state) = state.queues.get_mut(queue) else {
            return false;
        };
        let Some(mut message) = queue_state.in_flight.remove(&message_id) else {
            return false;
        };
        message.available_at = available_at;
        queue_state.pending.push_back(message);
        queue_state.notify.notify_one();
        true
    }
}

/// Cheap to clone; clones share the same queues.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting in a queue (visible or delayed), not counting leased ones
    pub fn pending_count(&self, queue: &str) -> usize {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map(|q| q.pending.len())
            .unwrap_or(0)
    }

    /// Messages leased to a consumer and not yet settled
    pub fn in_flight_count(&self, queue: &str) -> usize {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    /// Payloads waiting in a queue, oldest first
    pub fn pending_payloads(&self, queue: &str) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map(|q| q.pending.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    fn declare_queue(&self, topic: &str, queue: &str) -> AppResult<()> {
        let mut state = self.shared.lock();
        match state.queues.get(queue) {
            Some(existing) if existing.topic != topic => Err(AppError::Broker(format!(
                "Queue '{}' is already bound to topic '{}'",
                queue, existing.topic
            ))),
            Some(_) => Ok(()),
            None => {
                state.queues.insert(
                    queue.to_string(),
                    QueueState {
                        topic: topic.to_string(),
                        pending: VecDeque::new(),
                        in_flight: HashMap::new(),
                        notify: Arc::new(Notify::new()),
                    },
                );
                debug!("[BROKER] Declared queue '{}' on topic '{}'", queue, topic);
                Ok(())
            }
        }
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> AppResult<usize> {
        let mut state = self.shared.lock();
        let now = Instant::now();
        let mut next_id = state.next_id;
        let mut delivered = 0;

        for queue_state in state.queues.values_mut().filter(|q| q.topic == topic) {
            next_id += 1;
            queue_state.pending.push_back(StoredMessage {
                id: next_id,
                topic: topic.to_string(),
                payload: payload.clone(),
                attempts: 0,
                available_at: now,
            });
            queue_state.notify.notify_one();
            delivered += 1;
        }
        state.next_id = next_id;

        if delivered == 0 {
            debug!("[BROKER] No queue bound to '{}', message dropped", topic);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, topic: &str, queue: &str) -> AppResult<Box<dyn Subscription>> {
        let notify = {
            let state = self.shared.lock();
            let queue_state = state
                .queues
                .get(queue)
                .ok_or_else(|| AppError::Broker(format!("Queue '{}' is not declared", queue)))?;
            if queue_state.topic != topic {
                return Err(AppError::Broker(format!(
                    "Queue '{}' is bound to '{}', not '{}'",
                    queue, queue_state.topic, topic
                )));
            }
            Arc::clone(&queue_state.notify)
        };

        Ok(Box::new(InMemorySubscription {
            shared: Arc::clone(&self.shared),
            queue: queue.to_string(),
            notify,
        }))
    }
}

impl Acknowledger for Shared {
    fn ack(&self, queue: &str, message_id: MessageId) -> AppResult<()> {
        let mut state = self.lock();
        if let Some(queue_state) = state.queues.get_mut(queue) {
            queue_state.in_flight.remove(&message_id);
        }
        Ok(())
    }

    fn nack(&self, queue: &str, message_id: MessageId, delay: Duration) -> AppResult<()> {
        self.requeue(queue, message_id, Instant::now() + delay);
        Ok(())
    }

    fn release(&self, queue: &str, message_id: MessageId) {
        if self.requeue(queue, message_id, Instant::now()) {
            debug!("[BROKER] Unsettled message {} returned to '{}'", message_id, queue);
        }
    }
}

struct InMemorySubscription {
    shared: Arc<Shared>,
    queue: String,
    notify: Arc<Notify>,
}

enum Poll {
    Ready(StoredMessage),
    WaitUntil(Option<Instant>),
}

impl InMemorySubscription {
    fn try_claim(&self) -> AppResult<Poll> {
        let mut state = self.shared.lock();
        let queue_state = state
            .queues
            .get_mut(&self.queue)
            .ok_or_else(|| AppError::Broker(format!("Queue '{}' is not declared", self.queue)))?;

        let now = Instant::now();
        match queue_state.pending.iter().position(|m| m.available_at <= now) {
            Some(index) => {
                let Some(mut message) = queue_state.pending.remove(index) else {
                    return Ok(Poll::WaitUntil(None));
                };
                message.attempts += 1;
                queue_state.in_flight.insert(message.id, message.clone());
                Ok(Poll::Ready(message))
            }
            None => Ok(Poll::WaitUntil(
                queue_state.pending.iter().map(|m| m.available_at).min(),
            )),
        }
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> AppResult<Delivery> {
        loop {
            match self.try_claim()? {
                Poll::Ready(message) => {
                    let acker: Arc<dyn Acknowledger> = self.shared.clone();
                    return Ok(Delivery::new(
                        message.topic,
                        self.queue.clone(),
                        message.payload,
                        message.attempts,
                        message.id,
                        acker,
                    ));
                }
                Poll::WaitUntil(Some(at)) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
                Poll::WaitUntil(None) => self.notify.notified().await,
            }
        }
    }
}

// events/broker/mod.rs
//
// Message broker abstraction
//
// Topics fan out to durable named queues. Every queue bound to a topic gets
// its own copy of each message published after the binding exists.
// Delivery is at-least-once: a message stays in its queue until acked.

mod memory;
mod sqlite;

pub use memory::InMemoryBroker;
pub use sqlite::SqliteBroker;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;

/// Identity of a stored message inside one broker
pub type MessageId = i64;

/// Publish/subscribe over durable queues.
///
/// `publish` and `declare_queue` are synchronous so that blocking write
/// paths can call them right after their transaction commits.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Create the queue and bind it to `topic`. Idempotent.
    fn declare_queue(&self, topic: &str, queue: &str) -> AppResult<()>;

    /// Enqueue `payload` on every queue bound to `topic`.
    /// Returns how many queues received it.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> AppResult<usize>;

    /// Start pulling from an already declared queue.
    async fn subscribe(&self, topic: &str, queue: &str) -> AppResult<Box<dyn Subscription>>;
}

/// A pull cursor on one queue
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next visible message and lease it to the caller
    async fn next(&mut self) -> AppResult<Delivery>;
}

/// Settles leased messages. Implemented by each broker.
pub(crate) trait Acknowledger: Send + Sync {
    fn ack(&self, queue: &str, message_id: MessageId) -> AppResult<()>;

    fn nack(&self, queue: &str, message_id: MessageId, delay: Duration) -> AppResult<()>;

    /// Delivery dropped without being settled
    fn release(&self, queue: &str, message_id: MessageId);
}

/// One leased message.
///
/// Must be settled with `ack` or `nack`. A delivery dropped unsettled is
/// released back to its broker, which redelivers it.
pub struct Delivery {
    pub topic: String,
    pub queue: String,
    pub payload: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery
    pub attempt: u32,
    message_id: MessageId,
    acker: Arc<dyn Acknowledger>,
    settled: bool,
}

impl Delivery {
    pub(crate) fn new(
        topic: String,
        queue: String,
        payload: Vec<u8>,
        attempt: u32,
        message_id: MessageId,
        acker: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            topic,
            queue,
            payload,
            attempt,
            message_id,
            acker,
            settled: false,
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Remove the message from its queue
    pub async fn ack(mut self) -> AppResult<()> {
        self.settled = true;
        let acker = Arc::clone(&self.acker);
        let queue = self.queue.clone();
        let message_id = self.message_id;
        tokio::task::spawn_blocking(move || acker.ack(&queue, message_id)).await?
    }

    /// Return the message to its queue, visible again after `delay`
    pub async fn nack(mut self, delay: Duration) -> AppResult<()> {
        self.settled = true;
        let acker = Arc::clone(&self.acker);
        let queue = self.queue.clone();
        let message_id = self.message_id;
        tokio::task::spawn_blocking(move || acker.nack(&queue, message_id, delay)).await?
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.settled {
            self.acker.release(&self.queue, self.message_id);
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("topic", &self.topic)
            .field("queue", &self.queue)
            .field("message_id", &self.message_id)
            .field("attempt", &self.attempt)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

// events/broker/sqlite.rs
//
// Durable broker on a SQLite file shared between processes.
//
// A claimed message is leased until `locked_until`. If the claimant dies the
// lease lapses and the next claim picks the message up again, so nothing is
// lost between claim and ack.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{Acknowledger, Delivery, MessageBroker, MessageId, Subscription};
use crate::db::{create_connection_pool, get_connection, initialize_broker_store, ConnectionPool};
use crate::error::{AppError, AppResult};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

struct BrokerStore {
    pool: Arc<ConnectionPool>,
    visibility_timeout: Duration,
}

impl BrokerStore {
    fn queue_topic(&self, queue: &str) -> AppResult<Option<String>> {
        let conn = self.pool.get()?;
        let topic = conn
            .query_row(
                "SELECT topic FROM broker_queues WHERE queue = ?1",
                params![queue],
                |row| row.get(0),
            )
            .optional()?;
        Ok(topic)
    }

    /// Lease the oldest visible message in one statement so that two
    /// processes polling the same queue never claim the same row.
    fn claim(&self, queue: &str) -> AppResult<Option<(MessageId, String, Vec<u8>, u32)>> {
        let conn = self.pool.get()?;
        let now = now_millis();
        let lease_until = now.saturating_add(millis(self.visibility_timeout));

        let claimed = conn
            .query_row(
                "UPDATE broker_messages
                 SET attempts = attempts + 1, locked_until = ?3
                 WHERE id = (
                     SELECT id FROM broker_messages
                     WHERE queue = ?1
                       AND available_at <= ?2
                       AND (locked_until IS NULL OR locked_until <= ?2)
                     ORDER BY available_at, id
                     LIMIT 1
                 )
                 RETURNING id, topic, payload, attempts",
                params![queue, now, lease_until],
                |row| {
                    let attempts: i64 = row.get(3)?;
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        u32::try_from(attempts).unwrap_or(u32::MAX),
                    ))
                },
            )
            .optional()?;
        Ok(claimed)
    }
}

impl Acknowledger for BrokerStore {
    fn ack(&self, queue: &str, message_id: MessageId) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM broker_messages WHERE id = ?1 AND queue = ?2",
            params![message_id, queue],
        )?;
        Ok(())
    }

    fn nack(&self, queue: &str, message_id: MessageId, delay: Duration) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE broker_messages SET locked_until = NULL, available_at = ?3
             WHERE id = ?1 AND queue = ?2",
            params![message_id, queue, now_millis().saturating_add(millis(delay))],
        )?;
        Ok(())
    }

    fn release(&self, queue: &str, message_id: MessageId) {
        // Settling here would block inside an async context; the lease lapses instead.
        debug!(
            "[BROKER] Message {} on '{}' dropped unsettled, redelivered after lease expiry",
            message_id, queue
        );
    }
}

/// SQLite-backed durable broker
#[derive(Clone)]
pub struct SqliteBroker {
    store: Arc<BrokerStore>,
    poll_interval: Duration,
}

impl SqliteBroker {
    /// Open (creating if needed) the broker file and apply its schema.
    pub fn open(
        path: &Path,
        visibility_timeout: Duration,
        poll_interval: Duration,
    ) -> AppResult<Self> {
        let pool = create_connection_pool(path, 4)?;
        let conn = get_connection(&pool)?;
        initialize_broker_store(&conn)
            .map_err(|e| AppError::Broker(format!("Broker store unavailable: {}", e)))?;
        drop(conn);
        info!("[BROKER] Durable broker opened at {}", path.display());
        Ok(Self::with_pool(Arc::new(pool), visibility_timeout, poll_interval))
    }

    /// Wrap a pool whose schema is already initialized
    pub fn with_pool(
        pool: Arc<ConnectionPool>,
        visibility_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store: Arc::new(BrokerStore {
                pool,
                visibility_timeout,
            }),
            poll_interval,
        }
    }

    /// Messages in a queue, leased or not
    pub fn depth(&self, queue: &str) -> AppResult<usize> {
        let conn = self.store.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM broker_messages WHERE queue = ?1",
            params![queue],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl MessageBroker for SqliteBroker {
    fn declare_queue(&self, topic: &str, queue: &str) -> AppResult<()> {
        let conn = self.store.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO broker_queues (queue, topic, created_at) VALUES (?1, ?2, ?3)",
            params![queue, topic, Utc::now().to_rfc3339()],
        )?;
        let bound: String = conn.query_row(
            "SELECT topic FROM broker_queues WHERE queue = ?1",
            params![queue],
            |row| row.get(0),
        )?;
        if bound != topic {
            return Err(AppError::Broker(format!(
                "Queue '{}' is already bound to topic '{}'",
                queue, bound
            )));
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> AppResult<usize> {
        let conn = self.store.pool.get()?;
        let delivered = conn.execute(
            "INSERT INTO broker_messages (queue, topic, payload, attempts, available_at, published_at)
             SELECT queue, ?1, ?2, 0, ?3, ?4 FROM broker_queues WHERE topic = ?1",
            params![topic, payload, now_millis(), Utc::now().to_rfc3339()],
        )?;
        if delivered == 0 {
            debug!("[BROKER] No queue bound to '{}', message dropped", topic);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, topic: &str, queue: &str) -> AppResult<Box<dyn Subscription>> {
        let store = Arc::clone(&self.store);
        let owned_queue = queue.to_string();
        let bound = tokio::task::spawn_blocking(move || store.queue_topic(&owned_queue)).await??;

        match bound {
            Some(bound) if bound == topic => Ok(Box::new(SqliteSubscription {
                store: Arc::clone(&self.store),
                queue: queue.to_string(),
                poll_interval: self.poll_interval,
            })),
            Some(bound) => Err(AppError::Broker(format!(
                "Queue '{}' is bound to '{}', not '{}'",
                queue, bound, topic
            ))),
            None => Err(AppError::Broker(format!("Queue '{}' is not declared", queue))),
        }
    }
}

struct SqliteSubscription {
    store: Arc<BrokerStore>,
    queue: String,
    poll_interval: Duration,
}

#[async_trait]
impl Subscription for SqliteSubscription {
    async fn next(&mut self) -> AppResult<Delivery> {
        loop {
            let store = Arc::clone(&self.store);
            let queue = self.queue.clone();
            let claimed = tokio::task::spawn_blocking(move || store.claim(&queue)).await??;

            if let Some((message_id, topic, payload, attempt)) = claimed {
                let acker: Arc<dyn Acknowledger> = self.store.clone();
                return Ok(Delivery::new(
                    topic,
                    self.queue.clone(),
                    payload,
                    attempt,
                    message_id,
                    acker,
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOPIC: &str = "review.created";

    fn open_broker(dir: &TempDir, visibility: Duration) -> SqliteBroker {
        SqliteBroker::open(
            &dir.path().join("broker.db"),
            visibility,
            Duration::from_millis(10),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_messages_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let broker = open_broker(&dir, Duration::from_secs(30));
            broker.declare_queue(TOPIC, "q").unwrap();
            assert_eq!(broker.publish(TOPIC, b"durable".to_vec()).unwrap(), 1);
        }

        let broker = open_broker(&dir, Duration::from_secs(30));
        let mut sub = broker.subscribe(TOPIC, "q").await.unwrap();
        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload, b"durable".to_vec());
        assert_eq!(delivery.attempt, 1);
        delivery.ack().await.unwrap();
        assert_eq!(broker.depth("q").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nack_makes_message_visible_again() {
        let dir = TempDir::new().unwrap();
        let broker = open_broker(&dir, Duration::from_secs(30));
        broker.declare_queue(TOPIC, "q").unwrap();
        broker.publish(TOPIC, b"retry".to_vec()).unwrap();
        let mut sub = broker.subscribe(TOPIC, "q").await.unwrap();

        sub.next().await.unwrap().nack(Duration::ZERO).await.unwrap();
        let again = sub.next().await.unwrap();
        assert_eq!(again.attempt, 2);
        again.ack().await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lease_is_redelivered() {
        let dir = TempDir::new().unwrap();
        let broker = open_broker(&dir, Duration::from_millis(50));
        broker.declare_queue(TOPIC, "q").unwrap();
        broker.publish(TOPIC, b"lost".to_vec()).unwrap();
        let mut sub = broker.subscribe(TOPIC, "q").await.unwrap();

        // Leased and never settled, as if the consumer crashed
        let first = sub.next().await.unwrap();
        std::mem::forget(first);

        let again = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.attempt, 2);
        again.ack().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_without_bound_queue_is_dropped() {
        let dir = TempDir::new().unwrap();
        let broker = open_broker(&dir, Duration::from_secs(30));
        assert_eq!(broker.publish(TOPIC, b"nobody".to_vec()).unwrap(), 0);
        assert!(broker.subscribe(TOPIC, "q").await.is_err());
    }
}

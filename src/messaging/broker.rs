//! # Message Broker
//!
//! Broker contract and the pgmq-rs implementation. pgmq gives the engine its
//! at-least-once semantics: a read makes the message invisible for the
//! visibility timeout, an ack deletes it, and anything else brings it back
//! with an incremented read count. `retry` is therefore a no-op at the pgmq
//! layer; redelivery happens when the visibility timeout lapses.

use async_trait::async_trait;
use pgmq::PGMQueue;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::{MessagingError, MessagingResult};
use super::message::TaskMessage;

/// One delivered message plus its transport bookkeeping.
///
/// `attempts` is the broker-side read count: 1 on first delivery. It is
/// independent of the domain-level `Task.attempts` column.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: i64,
    pub attempts: i32,
    pub body: TaskMessage,
}

/// Transport contract consumed by the enqueuer and queue consumer.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Send a message for immediate delivery.
    async fn send(&self, message: &TaskMessage) -> MessagingResult<i64>;

    /// Send a message that becomes visible after `delay`.
    async fn send_delayed(&self, message: &TaskMessage, delay: Duration) -> MessagingResult<i64>;

    /// Receive up to `limit` messages, making them invisible to other
    /// consumers for the broker's visibility window.
    async fn receive_batch(&self, limit: i32) -> MessagingResult<Vec<Delivery>>;

    /// Acknowledge a delivery, removing the message permanently.
    async fn ack(&self, delivery: &Delivery) -> MessagingResult<()>;

    /// Release a delivery for redelivery.
    async fn retry(&self, delivery: &Delivery) -> MessagingResult<()>;
}

/// pgmq-backed broker bound to a single queue.
#[derive(Debug, Clone)]
pub struct PgmqBroker {
    pgmq: PGMQueue,
    queue_name: String,
    visibility_timeout_seconds: i32,
}

impl PgmqBroker {
    /// Connect to pgmq with a connection string.
    pub async fn new(
        database_url: &str,
        queue_name: impl Into<String>,
        visibility_timeout_seconds: i32,
    ) -> MessagingResult<Self> {
        let queue_name = queue_name.into();
        info!(queue = %queue_name, "connecting to pgmq");

        let pgmq = PGMQueue::new(database_url.to_string()).await?;

        Ok(Self {
            pgmq,
            queue_name,
            visibility_timeout_seconds,
        })
    }

    /// Create the backing queue if it does not exist. Safe to call on every
    /// startup.
    pub async fn ensure_queue(&self) -> MessagingResult<()> {
        self.pgmq.create(&self.queue_name).await.map_err(|e| {
            MessagingError::queue_operation(&self.queue_name, "create", e.to_string())
        })?;

        info!(queue = %self.queue_name, "queue ready");
        Ok(())
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl MessageBroker for PgmqBroker {
    async fn send(&self, message: &TaskMessage) -> MessagingResult<i64> {
        let message_id = self
            .pgmq
            .send(&self.queue_name, message)
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "send", e.to_string())
            })?;

        debug!(
            queue = %self.queue_name,
            task_id = %message.task_id,
            message_id,
            "message sent"
        );
        Ok(message_id)
    }

    async fn send_delayed(&self, message: &TaskMessage, delay: Duration) -> MessagingResult<i64> {
        let message_id = self
            .pgmq
            .send_delay(&self.queue_name, message, delay.as_secs())
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "send_delay", e.to_string())
            })?;

        debug!(
            queue = %self.queue_name,
            task_id = %message.task_id,
            message_id,
            delay_seconds = delay.as_secs(),
            "delayed message sent"
        );
        Ok(message_id)
    }

    async fn receive_batch(&self, limit: i32) -> MessagingResult<Vec<Delivery>> {
        let messages = self
            .pgmq
            .read_batch::<serde_json::Value>(
                &self.queue_name,
                Some(self.visibility_timeout_seconds),
                limit,
            )
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "read_batch", e.to_string())
            })?
            .unwrap_or_default();

        let mut deliveries = Vec::with_capacity(messages.len());
        for msg in messages {
            match TaskMessage::from_json(msg.message) {
                Ok(body) => deliveries.push(Delivery {
                    message_id: msg.msg_id,
                    attempts: msg.read_ct,
                    body,
                }),
                Err(e) => {
                    // An undecodable message can never be processed; drop it
                    // rather than letting it cycle through redelivery forever.
                    warn!(
                        queue = %self.queue_name,
                        message_id = msg.msg_id,
                        error = %e,
                        "dropping undecodable message"
                    );
                    let _ = self.pgmq.delete(&self.queue_name, msg.msg_id).await;
                }
            }
        }

        debug!(
            queue = %self.queue_name,
            count = deliveries.len(),
            "batch received"
        );
        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> MessagingResult<()> {
        self.pgmq
            .delete(&self.queue_name, delivery.message_id)
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "delete", e.to_string())
            })?;

        debug!(
            queue = %self.queue_name,
            message_id = delivery.message_id,
            "message acked"
        );
        Ok(())
    }

    async fn retry(&self, delivery: &Delivery) -> MessagingResult<()> {
        // Leaving the message un-acked is the retry: it becomes visible again
        // once the visibility timeout lapses, with read_ct incremented.
        debug!(
            queue = %self.queue_name,
            message_id = delivery.message_id,
            attempts = delivery.attempts,
            "message left for redelivery"
        );
        Ok(())
    }
}

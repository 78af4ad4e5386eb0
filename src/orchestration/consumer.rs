//! # Queue Consumer
//!
//! Drains broker deliveries and owns the transport-level retry decision.
//! Messages of one batch are processed sequentially; parallelism comes from
//! running more consumer instances, with the broker's visibility window
//! keeping any one delivery on a single consumer at a time.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::error::Result;
use crate::messaging::{Delivery, MessageBroker};

use super::runner::TaskRunner;

/// Batch consumer over the task queue.
pub struct QueueConsumer {
    broker: Arc<dyn MessageBroker>,
    runner: Arc<TaskRunner>,
    batch_size: i32,
    max_delivery_attempts: i32,
    idle_poll_interval: Duration,
}

impl QueueConsumer {
    pub fn new(broker: Arc<dyn MessageBroker>, runner: Arc<TaskRunner>, config: &QueueConfig) -> Self {
        Self {
            broker,
            runner,
            batch_size: config.batch_size,
            max_delivery_attempts: config.max_delivery_attempts,
            idle_poll_interval: Duration::from_millis(config.idle_poll_interval_ms),
        }
    }

    /// Receive one batch and process it to completion. Returns the number of
    /// deliveries received.
    pub async fn process_batch(&self) -> Result<usize> {
        let deliveries = self.broker.receive_batch(self.batch_size).await?;
        let count = deliveries.len();

        for delivery in deliveries {
            self.process_delivery(delivery).await;
        }

        Ok(count)
    }

    /// Consume until the shutdown signal flips, sleeping between empty
    /// batches.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(batch_size = self.batch_size, "queue consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let processed = match self.process_batch().await {
                Ok(count) => count,
                Err(e) => {
                    error!(error = %e, "batch receive failed");
                    0
                }
            };

            if processed == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.idle_poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        info!("queue consumer stopped");
    }

    /// One delivery, one decision: ack on success, leave for redelivery
    /// while transport attempts remain, dead-letter and ack once they are
    /// spent. The transport counter here is independent of the domain
    /// attempts the runner tracks on the row.
    async fn process_delivery(&self, delivery: Delivery) {
        match self.runner.execute(&delivery.body).await {
            Ok(()) => {
                debug!(
                    task_id = %delivery.body.task_id,
                    message_id = delivery.message_id,
                    "delivery processed"
                );
                if let Err(e) = self.broker.ack(&delivery).await {
                    warn!(message_id = delivery.message_id, error = %e, "ack failed");
                }
            }
            Err(execution_error) => {
                if delivery.attempts < self.max_delivery_attempts {
                    warn!(
                        task_id = %delivery.body.task_id,
                        message_id = delivery.message_id,
                        delivery_attempts = delivery.attempts,
                        error = %execution_error,
                        "execution failed; leaving delivery for broker redelivery"
                    );
                    if let Err(e) = self.broker.retry(&delivery).await {
                        warn!(message_id = delivery.message_id, error = %e, "retry failed");
                    }
                } else {
                    error!(
                        task_id = %delivery.body.task_id,
                        message_id = delivery.message_id,
                        delivery_attempts = delivery.attempts,
                        error = %execution_error,
                        "delivery attempts exhausted; dead-lettering"
                    );
                    if let Err(e) = self
                        .runner
                        .handle_failure(&delivery.body, &execution_error.to_string())
                        .await
                    {
                        error!(
                            task_id = %delivery.body.task_id,
                            error = %e,
                            "dead-letter finalize failed"
                        );
                    }
                    if let Err(e) = self.broker.ack(&delivery).await {
                        warn!(message_id = delivery.message_id, error = %e, "ack failed");
                    }
                }
            }
        }
    }
}

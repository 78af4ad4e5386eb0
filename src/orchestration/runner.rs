//! # Task Runner
//!
//! Owns the per-task execution lifecycle: the feature-flag gate, status
//! transitions, the append-only execution audit trail, and domain-level
//! attempt counting. Broker-level redelivery is the queue consumer's
//! concern; nothing in this module re-sends a message.
//!
//! Failure handling records the execution row *before* the failure is
//! considered handled, so every attempt is auditable even when the process
//! dies immediately afterwards.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::handlers::{HandlerContext, TaskResult};
use crate::messaging::TaskMessage;
use crate::models::{ExecutionStatus, ExecutionUpdate, TaskStatus, TaskUpdate};
use crate::registry::HandlerRegistry;
use crate::store::{StoreError, TaskStore};

/// Drives one task message through its handler and lifecycle bookkeeping.
pub struct TaskRunner {
    store: Arc<dyn TaskStore>,
    registry: Arc<HandlerRegistry>,
    context: HandlerContext,
}

impl TaskRunner {
    pub fn new(
        store: Arc<dyn TaskStore>,
        registry: Arc<HandlerRegistry>,
        context: HandlerContext,
    ) -> Self {
        Self {
            store,
            registry,
            context,
        }
    }

    /// Execute one delivery of a task message.
    ///
    /// Returning `Ok(())` tells the queue consumer to ack. A disabled feature
    /// flag is a silent skip: the message is acked and no execution row is
    /// written. A row already in a terminal state is also a skip — under
    /// at-least-once delivery a message can arrive after its task was
    /// cancelled or completed, and reviving it would overwrite that state.
    /// Errors propagate so the consumer's retry/dead-letter logic also runs,
    /// after domain attempts have been recorded here.
    pub async fn execute(&self, message: &TaskMessage) -> Result<()> {
        if !self.context.config.flags.is_enabled(&message.task_type) {
            info!(
                task_id = %message.task_id,
                task_type = %message.task_type,
                "task type disabled by feature flag; skipping"
            );
            return Ok(());
        }

        let task = self
            .store
            .get_task_by_id(message.task_id)
            .await?
            .ok_or_else(|| EngineError::Store(StoreError::not_found("task", message.task_id)))?;

        if task.status.is_terminal() {
            info!(
                task_id = %message.task_id,
                task_type = %message.task_type,
                status = %task.status,
                "task already in terminal state; skipping delivery"
            );
            return Ok(());
        }

        let handler = self.registry.get(&message.task_type).ok_or_else(|| {
            EngineError::HandlerNotFound {
                task_type: message.task_type.clone(),
            }
        })?;

        self.store
            .update_task(
                message.task_id,
                TaskUpdate::status(TaskStatus::Running).with_last_attempted_at(Utc::now()),
            )
            .await?;

        // Fall back to a generated id when the store yields no audit row, so
        // attempt timing can still be recorded against something.
        let execution_id = match self
            .store
            .create_task_execution(message.task_id, ExecutionStatus::Running)
            .await?
        {
            Some(execution) => execution.id,
            None => Uuid::new_v4(),
        };

        let started = Instant::now();
        debug!(
            task_id = %message.task_id,
            task_type = %message.task_type,
            execution_id = %execution_id,
            "handler invocation started"
        );

        let outcome = handler.handle(message, &self.context).await;

        // Handlers report failures two ways: a thrown error or an explicit
        // error result. Unify them here so both take the same path.
        let outcome = match outcome {
            Ok(result) if result.is_error() => Err(EngineError::handler(
                result
                    .message
                    .unwrap_or_else(|| "handler reported an error".to_string()),
            )),
            other => other,
        };

        let duration_ms = started.elapsed().as_millis() as i64;

        match outcome {
            Ok(result) => {
                self.record_success(message, execution_id, duration_ms, result)
                    .await
            }
            Err(error) => {
                self.record_failure(message, execution_id, duration_ms, error)
                    .await
            }
        }
    }

    /// Dead-letter finalization: mark the task failed regardless of how many
    /// domain attempts remain. Used by the queue consumer once transport
    /// redelivery is exhausted.
    pub async fn handle_failure(&self, message: &TaskMessage, error_message: &str) -> Result<()> {
        error!(
            task_id = %message.task_id,
            task_type = %message.task_type,
            error = %error_message,
            "dead-lettering task"
        );

        self.store
            .update_task(
                message.task_id,
                TaskUpdate::status(TaskStatus::Failed).with_error_message(error_message),
            )
            .await?;
        Ok(())
    }

    async fn record_success(
        &self,
        message: &TaskMessage,
        execution_id: Uuid,
        duration_ms: i64,
        result: TaskResult,
    ) -> Result<()> {
        self.store
            .update_task_execution(
                execution_id,
                ExecutionUpdate::completed(duration_ms, result.data),
            )
            .await?;

        self.store
            .update_task(
                message.task_id,
                TaskUpdate::status(TaskStatus::Completed).with_completed_at(Utc::now()),
            )
            .await?;

        info!(
            task_id = %message.task_id,
            task_type = %message.task_type,
            duration_ms,
            "task completed"
        );
        Ok(())
    }

    async fn record_failure(
        &self,
        message: &TaskMessage,
        execution_id: Uuid,
        duration_ms: i64,
        error: EngineError,
    ) -> Result<()> {
        let error_message = error.to_string();

        self.store
            .update_task_execution(
                execution_id,
                ExecutionUpdate::failed(duration_ms, &error_message),
            )
            .await?;

        // Re-fetch for the authoritative attempts count; the message is a
        // dispatch hint, the row is the source of truth.
        let task = self
            .store
            .get_task_by_id(message.task_id)
            .await?
            .ok_or_else(|| EngineError::Store(StoreError::not_found("task", message.task_id)))?;

        let attempts = task.attempts + 1;
        let exhausted = attempts >= task.max_attempts;
        let next_status = if exhausted {
            TaskStatus::Failed
        } else {
            // Back to queued for a future pickup. No broker message is sent
            // here; redelivery is the transport layer's decision.
            TaskStatus::Queued
        };

        self.store
            .update_task(
                message.task_id,
                TaskUpdate::status(next_status)
                    .with_attempts(attempts)
                    .with_error_message(&error_message),
            )
            .await?;

        if exhausted {
            error!(
                task_id = %message.task_id,
                task_type = %message.task_type,
                attempts,
                error = %error_message,
                "task failed permanently; domain attempts exhausted"
            );
        } else {
            warn!(
                task_id = %message.task_id,
                task_type = %message.task_type,
                attempts,
                max_attempts = task.max_attempts,
                error = %error_message,
                "task attempt failed; returned to queued"
            );
        }

        Err(error)
    }
}

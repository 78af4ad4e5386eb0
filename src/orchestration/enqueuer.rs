//! # Task Enqueuer
//!
//! Entry point for putting work into the engine: creates the durable task
//! row, then hands a minimal [`TaskMessage`] to the broker. The row write
//! and the broker send are deliberately not atomic — if the broker is down
//! the row stays queued with nothing in flight, the failure is logged, and
//! the caller still gets the task id back. An out-of-band reconciliation
//! sweep can find such rows later; failing the call outright would turn a
//! transport blip into a lost request.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PRIORITY, DEFAULT_USER_TASKS_LIMIT};
use crate::error::{EngineError, Result};
use crate::messaging::{MessageBroker, TaskMessage};
use crate::models::{CreatedBy, NewTask, ScheduleType, Task, TaskStatus, TaskUpdate};
use crate::store::TaskStore;

/// Definition of a task to enqueue.
#[derive(Debug, Clone)]
pub struct NewTaskRequest {
    pub task_type: String,
    pub task_data: Value,
    pub user_id: Option<String>,
    pub schedule_type: ScheduleType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub cron_expression: Option<String>,
    pub priority: i32,
    pub max_attempts: i32,
    pub created_by: CreatedBy,
    pub metadata: Option<Value>,
}

impl NewTaskRequest {
    /// Create a request with engine defaults: immediate schedule, priority 5,
    /// three domain attempts, created by a user.
    pub fn new(task_type: impl Into<String>, task_data: Value) -> Self {
        Self {
            task_type: task_type.into(),
            task_data,
            user_id: None,
            schedule_type: ScheduleType::Immediate,
            scheduled_at: None,
            cron_expression: None,
            priority: DEFAULT_PRIORITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            created_by: CreatedBy::User,
            metadata: None,
        }
    }

    /// Set the owning user
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Schedule for a future dispatch time
    pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self.schedule_type = ScheduleType::Scheduled;
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the domain-level retry cap
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Mark as system-created
    pub fn with_created_by(mut self, created_by: CreatedBy) -> Self {
        self.created_by = created_by;
        self
    }

    /// Attach opaque metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn into_new_task(self) -> NewTask {
        NewTask {
            task_type: self.task_type,
            user_id: self.user_id,
            task_data: self.task_data,
            schedule_type: self.schedule_type,
            scheduled_at: self.scheduled_at,
            cron_expression: self.cron_expression,
            priority: self.priority,
            max_attempts: self.max_attempts,
            created_by: self.created_by,
            metadata: self.metadata,
        }
    }
}

/// Creates task rows and dispatches their messages.
pub struct TaskEnqueuer {
    store: Arc<dyn TaskStore>,
    broker: Arc<dyn MessageBroker>,
}

impl TaskEnqueuer {
    pub fn new(store: Arc<dyn TaskStore>, broker: Arc<dyn MessageBroker>) -> Self {
        Self { store, broker }
    }

    /// Create a queued task row and send its dispatch message.
    ///
    /// Exactly one store write and at most one broker send. The handler for
    /// `task_type` is resolved at execution time, not here; enqueuing an
    /// unknown type succeeds and fails later in the runner.
    pub async fn enqueue(&self, request: NewTaskRequest) -> Result<Uuid> {
        if request.task_type.trim().is_empty() {
            return Err(EngineError::validation("task_type must not be empty"));
        }

        let scheduled_at = request.scheduled_at;
        let task = self.store.create_task(request.into_new_task()).await?;
        let message = TaskMessage::from_task(&task);

        let send_result = match scheduled_at {
            Some(at) if at > Utc::now() => {
                let delay = (at - Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                self.broker.send_delayed(&message, delay).await
            }
            _ => self.broker.send(&message).await,
        };

        match send_result {
            Ok(message_id) => {
                debug!(
                    task_id = %task.id,
                    task_type = %task.task_type,
                    message_id,
                    "task enqueued"
                );
            }
            Err(error) => {
                // Degraded mode: row is queued, nothing is in flight.
                warn!(
                    task_id = %task.id,
                    task_type = %task.task_type,
                    error = %error,
                    "broker send failed; task row remains queued with no message in flight"
                );
            }
        }

        Ok(task.id)
    }

    /// Create a recurring task definition. Recurring rows are materialized by
    /// the cron dispatcher, so nothing is sent to the broker here.
    pub async fn schedule_recurring(
        &self,
        mut request: NewTaskRequest,
        cron_expression: impl Into<String>,
    ) -> Result<Uuid> {
        if request.task_type.trim().is_empty() {
            return Err(EngineError::validation("task_type must not be empty"));
        }

        request.schedule_type = ScheduleType::Recurring;
        request.cron_expression = Some(cron_expression.into());

        let task = self.store.create_task(request.into_new_task()).await?;
        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            cron = %task.cron_expression.as_deref().unwrap_or_default(),
            "recurring task scheduled"
        );
        Ok(task.id)
    }

    /// Read-through task lookup.
    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.store.get_task_by_id(id).await?)
    }

    /// Read-through listing of a user's tasks, newest first.
    pub async fn get_user_tasks(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<Task>> {
        let limit = limit.unwrap_or(DEFAULT_USER_TASKS_LIMIT);
        Ok(self.store.get_tasks_by_user(user_id, limit).await?)
    }

    /// Cancel a pending task. Returns `false` when the task is missing or
    /// already completed/cancelled. This is the only status transition that
    /// bypasses the task runner; an in-flight handler invocation is not
    /// interrupted, so cancellation takes effect between attempts.
    pub async fn cancel_task(&self, id: Uuid) -> Result<bool> {
        let Some(task) = self.store.get_task_by_id(id).await? else {
            return Ok(false);
        };

        if task.status.is_terminal() {
            return Ok(false);
        }

        self.store
            .update_task(id, TaskUpdate::status(TaskStatus::Cancelled))
            .await?;

        info!(task_id = %id, previous_status = %task.status, "task cancelled");
        Ok(true)
    }
}

//! # Task Model
//!
//! The `Task` row is the primary unit of work in the engine. Each row is
//! created by the enqueuer, dispatched through the broker as a
//! [`TaskMessage`](crate::messaging::TaskMessage), and driven through its
//! lifecycle by the task runner.
//!
//! ## Lifecycle
//!
//! ```text
//! queued -> running -> completed
//!                   -> queued      (domain failure, attempts < max_attempts)
//!                   -> failed      (domain failure, attempts >= max_attempts)
//! queued/running/failed -> cancelled (via cancel_task only)
//! ```
//!
//! ## Dual retry counters
//!
//! `attempts` is the *domain-level* counter: it increments only when a
//! handler invocation fails inside the task runner. Broker redelivery of the
//! same message does not touch it; the transport counter lives on the
//! delivery (`Delivery::attempts`) and is capped independently by the queue
//! consumer. The two answer different questions and are never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PRIORITY};

/// Lifecycle status of a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled rows never leave their state. A failed row is
    /// only terminal once domain attempts are exhausted, so it is not listed
    /// here; `cancel_task` may still pin it down.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// How a task reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Dispatched as soon as it is enqueued.
    Immediate,
    /// Dispatched at `scheduled_at` via a delayed broker send.
    Scheduled,
    /// Materialized by the cron dispatcher, never sent directly.
    Recurring,
    /// Enqueued in reaction to an external event.
    EventTriggered,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Immediate => "immediate",
            ScheduleType::Scheduled => "scheduled",
            ScheduleType::Recurring => "recurring",
            ScheduleType::EventTriggered => "event_triggered",
        }
    }
}

impl TryFrom<String> for ScheduleType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "immediate" => Ok(ScheduleType::Immediate),
            "scheduled" => Ok(ScheduleType::Scheduled),
            "recurring" => Ok(ScheduleType::Recurring),
            "event_triggered" => Ok(ScheduleType::EventTriggered),
            other => Err(format!("unknown schedule type: {other}")),
        }
    }
}

/// Origin of a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBy {
    User,
    System,
}

impl CreatedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatedBy::User => "user",
            CreatedBy::System => "system",
        }
    }
}

impl TryFrom<String> for CreatedBy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(CreatedBy::User),
            "system" => Ok(CreatedBy::System),
            other => Err(format!("unknown created_by: {other}")),
        }
    }
}

/// A durable unit of work.
///
/// Maps to the `tasks` table. `task_data` is opaque to the engine; its schema
/// is a private contract between the enqueuing caller and the handler
/// registered for `task_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    pub user_id: Option<String>,
    pub task_data: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub schedule_type: ScheduleType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub cron_expression: Option<String>,
    pub priority: i32,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    #[sqlx(try_from = "String")]
    pub created_by: CreatedBy,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether domain-level retries are exhausted.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Fields for task creation (generated columns omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub task_type: String,
    pub user_id: Option<String>,
    pub task_data: serde_json::Value,
    pub schedule_type: ScheduleType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub cron_expression: Option<String>,
    pub priority: i32,
    pub max_attempts: i32,
    pub created_by: CreatedBy,
    pub metadata: Option<serde_json::Value>,
}

impl NewTask {
    pub fn new(task_type: impl Into<String>, task_data: serde_json::Value) -> Self {
        Self {
            task_type: task_type.into(),
            user_id: None,
            task_data,
            schedule_type: ScheduleType::Immediate,
            scheduled_at: None,
            cron_expression: None,
            priority: DEFAULT_PRIORITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            created_by: CreatedBy::User,
            metadata: None,
        }
    }
}

/// Partial update for a task row. `None` fields are left untouched.
///
/// `error_message` uses a double option so a failure reason can be cleared
/// explicitly without clobbering it on every unrelated update.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub attempts: Option<i32>,
    pub error_message: Option<Option<String>>,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_attempts(mut self, attempts: i32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    pub fn with_last_attempted_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_attempted_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

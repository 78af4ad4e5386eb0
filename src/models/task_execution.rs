//! # Task Execution Model
//!
//! One `TaskExecution` row is created per handler invocation attempt and
//! finalized exactly once; rows are never mutated after finalization. The
//! full attempt history of a task is the set of its execution rows ordered
//! by creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Status of a single handler invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ExecutionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Audit row for one handler invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskExecution {
    pub id: Uuid,
    pub task_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ExecutionStatus,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Finalization for an execution row.
#[derive(Debug, Clone, Default)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub result_data: Option<serde_json::Value>,
}

impl ExecutionUpdate {
    /// Finalize as completed with timing and optional handler output.
    pub fn completed(duration_ms: i64, result_data: Option<serde_json::Value>) -> Self {
        Self {
            status: Some(ExecutionStatus::Completed),
            duration_ms: Some(duration_ms),
            error_message: None,
            result_data,
        }
    }

    /// Finalize as failed with timing and the failure reason.
    pub fn failed(duration_ms: i64, error_message: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            duration_ms: Some(duration_ms),
            error_message: Some(error_message.into()),
            result_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_status_round_trip() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
        ] {
            let parsed = ExecutionStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_finalization_helpers() {
        let done = ExecutionUpdate::completed(1500, Some(serde_json::json!({"ok": true})));
        assert_eq!(done.status, Some(ExecutionStatus::Completed));
        assert_eq!(done.duration_ms, Some(1500));
        assert!(done.error_message.is_none());

        let failed = ExecutionUpdate::failed(42, "boom");
        assert_eq!(failed.status, Some(ExecutionStatus::Failed));
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
        assert!(failed.result_data.is_none());
    }
}

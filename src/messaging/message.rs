//! # Task Wire Message
//!
//! The message sent through the broker is a minimal projection of the task
//! row: enough to look up the handler and run it. The row remains the source
//! of truth; the message is a dispatch hint and is never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Task;

/// Wire payload for one task dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: Uuid,
    pub task_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub task_data: serde_json::Value,
    pub priority: i32,
}

impl TaskMessage {
    pub fn new(
        task_id: Uuid,
        task_type: impl Into<String>,
        task_data: serde_json::Value,
        priority: i32,
    ) -> Self {
        Self {
            task_id,
            task_type: task_type.into(),
            user_id: None,
            task_data,
            priority,
        }
    }

    /// Project a task row into its dispatch message.
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            task_type: task.task_type.clone(),
            user_id: task.user_id.clone(),
            task_data: task.task_data.clone(),
            priority: task.priority,
        }
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Create from JSON from queue
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }
}

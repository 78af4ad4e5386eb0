//! # Task Handlers
//!
//! The [`TaskHandler`] trait is the seam between the scheduling core and the
//! pluggable business logic bound to each task type. Handlers must be
//! side-effect-idempotent: at-least-once delivery means the same message can
//! arrive twice.
//!
//! The poll-reconcile-requeue family lives in [`poll`] with one concrete
//! handler type per polled task type.

pub mod chat;
pub mod generation;
pub mod poll;
pub mod research;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::messaging::TaskMessage;
use crate::orchestration::enqueuer::TaskEnqueuer;

pub use chat::ChatCompletionPollHandler;
pub use generation::GenerationPollHandler;
pub use poll::{
    OperationPhase, OperationRecord, OperationRepository, ProviderStatus, StatusProvider,
};
pub use research::ResearchPollHandler;

/// Outcome of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResultStatus {
    Success,
    Error,
    Skipped,
}

/// Handler return value. Drives whether the task runner marks the task
/// completed, requeues it, or fails it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskResultStatus,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl TaskResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            status: TaskResultStatus::Success,
            message: None,
            data: None,
        }
    }

    /// Create a successful result with an explanatory message
    pub fn success_with_message(message: impl Into<String>) -> Self {
        Self {
            status: TaskResultStatus::Success,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Create a successful result carrying handler output
    pub fn success_with_data(data: serde_json::Value) -> Self {
        Self {
            status: TaskResultStatus::Success,
            message: None,
            data: Some(data),
        }
    }

    /// Create an error result. The task runner unifies this with a thrown
    /// error: the attempt is recorded as failed either way.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskResultStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Create a skipped result: the handler intentionally did nothing.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: TaskResultStatus::Skipped,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == TaskResultStatus::Error
    }
}

/// Engine facilities available to handlers during execution.
#[derive(Clone)]
pub struct HandlerContext {
    /// Enqueuer for handlers that schedule follow-up work (the poll family
    /// re-dispatches itself through this).
    pub enqueuer: Arc<TaskEnqueuer>,
    /// Engine configuration snapshot.
    pub config: Arc<EngineConfig>,
}

impl HandlerContext {
    pub fn new(enqueuer: Arc<TaskEnqueuer>, config: Arc<EngineConfig>) -> Self {
        Self { enqueuer, config }
    }
}

/// Business logic bound to a task type.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task type this handler is registered under.
    fn task_type(&self) -> &str;

    /// Execute one attempt. Errors propagate into the runner's attempt
    /// bookkeeping; an `Ok(TaskResult::error(..))` is treated identically.
    async fn handle(&self, message: &TaskMessage, ctx: &HandlerContext) -> Result<TaskResult>;
}

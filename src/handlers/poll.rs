//! # Poll-Reconcile-Requeue
//!
//! Shared driver for handlers that track a long-running operation at an
//! external provider. Each tick is a fresh task dispatch: the poll count
//! travels in `task_data`, not in process memory, so a crash between ticks
//! loses nothing.
//!
//! State machine per polled record:
//!
//! ```text
//! processing -> succeeded | failed          (terminal, provider settled)
//! processing -> processing                  (self-loop via delayed requeue)
//! processing -> failed("Polling timeout exceeded")
//!                                           (poll count exhausted; surfaced
//!                                            as an error so the runner's
//!                                            attempt machinery finalizes it)
//! ```
//!
//! Two outcomes that look alike but are not: a provider reporting the
//! *operation* failed is still a *successful poll* — the record is finalized
//! and the handler returns success. Only the timeout path returns an error,
//! deliberately, to force attempt exhaustion.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::messaging::TaskMessage;
use crate::models::CreatedBy;
use crate::orchestration::enqueuer::NewTaskRequest;

use super::{HandlerContext, TaskResult};

/// Error message persisted and returned when a poll budget is exhausted.
pub const POLL_TIMEOUT_MESSAGE: &str = "Polling timeout exceeded";

/// Field in `task_data` carrying the tick counter.
const POLL_COUNT_FIELD: &str = "poll_count";

/// Lifecycle phase of a polled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Processing,
    Succeeded,
    Failed,
}

/// Snapshot of the authoritative record tracking a remote operation.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    pub owner_id: Option<String>,
    /// Provider-specific handle used to query status.
    pub provider_handle: String,
    pub phase: OperationPhase,
}

/// Provider-reported status of a remote operation.
#[derive(Debug, Clone)]
pub enum ProviderStatus {
    Completed(Value),
    Failed(String),
    InProgress,
}

/// Persistence for the records a poll handler reconciles.
#[async_trait]
pub trait OperationRepository: Send + Sync {
    async fn load(&self, operation_id: &str) -> Result<Option<OperationRecord>>;

    /// Persist the provider's result and mark the record succeeded.
    async fn record_success(&self, operation_id: &str, result: &Value) -> Result<()>;

    /// Persist the failure reason and mark the record failed.
    async fn record_failure(&self, operation_id: &str, error: &str) -> Result<()>;
}

/// External provider capable of reporting operation status.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Whether this provider can be polled at all. A `false` here is a hard
    /// error in the driver, not a retry.
    fn supports_status_polling(&self) -> bool {
        true
    }

    async fn operation_status(&self, handle: &str) -> Result<ProviderStatus>;
}

/// Static shape of one poll handler: its task type, the `task_data` field
/// naming the operation, and its poll budget.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollSpec {
    pub task_type: &'static str,
    pub id_field: &'static str,
    pub max_polls: u32,
}

/// One tick of the poll-reconcile-requeue cycle.
///
/// Validation and authorization failures return `TaskResult::error` without
/// partial work; transient repository/provider failures propagate as errors
/// so the standard attempts path applies.
pub(crate) async fn run_poll_cycle(
    spec: PollSpec,
    repository: &dyn OperationRepository,
    provider: &dyn StatusProvider,
    message: &TaskMessage,
    ctx: &HandlerContext,
) -> Result<TaskResult> {
    let Some(operation_id) = message.task_data.get(spec.id_field).and_then(Value::as_str) else {
        return Ok(TaskResult::error(format!(
            "missing required field: {}",
            spec.id_field
        )));
    };
    let Some(owner_id) = message.task_data.get("user_id").and_then(Value::as_str) else {
        return Ok(TaskResult::error("missing required field: user_id"));
    };
    // Compared in u64: a corrupt oversized counter must exhaust the budget,
    // not wrap around and restart it.
    let poll_count = message
        .task_data
        .get(POLL_COUNT_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let Some(record) = repository.load(operation_id).await? else {
        return Ok(TaskResult::error(format!(
            "operation not found: {operation_id}"
        )));
    };

    if record.owner_id.as_deref() != Some(owner_id) {
        warn!(
            task_type = spec.task_type,
            operation_id,
            "owner mismatch on polled operation"
        );
        return Ok(TaskResult::error("operation does not belong to this user"));
    }

    // A settled record means some earlier delivery already reconciled it;
    // under at-least-once delivery this must be a safe no-op.
    if record.phase != OperationPhase::Processing {
        debug!(
            task_type = spec.task_type,
            operation_id, "record already settled; nothing to do"
        );
        return Ok(TaskResult::success_with_message("not in processing state"));
    }

    if !provider.supports_status_polling() {
        return Err(EngineError::provider(
            "operation_status",
            "provider does not support status polling",
        ));
    }

    match provider.operation_status(&record.provider_handle).await? {
        ProviderStatus::Completed(result) => {
            repository.record_success(&record.operation_id, &result).await?;
            info!(
                task_type = spec.task_type,
                operation_id, poll_count, "operation completed"
            );
            Ok(TaskResult::success())
        }
        ProviderStatus::Failed(provider_error) => {
            repository
                .record_failure(&record.operation_id, &provider_error)
                .await?;
            info!(
                task_type = spec.task_type,
                operation_id,
                poll_count,
                error = %provider_error,
                "operation failed at provider"
            );
            // The poll itself succeeded; only the remote operation failed.
            Ok(TaskResult::success_with_message("operation failed"))
        }
        ProviderStatus::InProgress => {
            if poll_count >= u64::from(spec.max_polls) {
                repository
                    .record_failure(&record.operation_id, POLL_TIMEOUT_MESSAGE)
                    .await?;
                warn!(
                    task_type = spec.task_type,
                    operation_id,
                    poll_count,
                    max_polls = spec.max_polls,
                    "poll budget exhausted"
                );
                return Ok(TaskResult::error(POLL_TIMEOUT_MESSAGE));
            }

            let mut next_data = message.task_data.clone();
            next_data[POLL_COUNT_FIELD] = json!(poll_count + 1);

            let scheduled_at =
                Utc::now() + Duration::seconds(ctx.config.poll.requeue_delay_seconds);
            let mut request = NewTaskRequest::new(spec.task_type, next_data)
                .with_scheduled_at(scheduled_at)
                .with_priority(message.priority)
                .with_created_by(CreatedBy::System);
            if let Some(user_id) = &message.user_id {
                request = request.with_user(user_id.clone());
            }

            ctx.enqueuer.enqueue(request).await?;

            debug!(
                task_type = spec.task_type,
                operation_id,
                next_poll = poll_count + 1,
                "operation still in progress; re-queued"
            );
            Ok(TaskResult::success_with_message("re-queued"))
        }
    }
}

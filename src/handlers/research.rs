//! Poll handler for deep research runs.
//!
//! Research runs are the slowest operations the engine tracks, so this
//! handler carries the largest poll budget: 240 ticks at 5 seconds, a
//! 20 minute ceiling.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PollConfig;
use crate::error::Result;
use crate::messaging::TaskMessage;

use super::poll::{run_poll_cycle, OperationRepository, PollSpec, StatusProvider};
use super::{HandlerContext, TaskHandler, TaskResult};

/// Task type this handler is registered under.
pub const RESEARCH_POLL_TASK_TYPE: &str = "research_poll";

/// Polls a pending research run until the provider settles it.
///
/// `task_data` contract: `run_id`, `user_id`, optional `poll_count`.
pub struct ResearchPollHandler {
    repository: Arc<dyn OperationRepository>,
    provider: Arc<dyn StatusProvider>,
    max_polls: u32,
}

impl ResearchPollHandler {
    pub fn new(
        repository: Arc<dyn OperationRepository>,
        provider: Arc<dyn StatusProvider>,
        config: &PollConfig,
    ) -> Self {
        Self {
            repository,
            provider,
            max_polls: config.research_max_polls,
        }
    }

    fn spec(&self) -> PollSpec {
        PollSpec {
            task_type: RESEARCH_POLL_TASK_TYPE,
            id_field: "run_id",
            max_polls: self.max_polls,
        }
    }
}

#[async_trait]
impl TaskHandler for ResearchPollHandler {
    fn task_type(&self) -> &str {
        RESEARCH_POLL_TASK_TYPE
    }

    async fn handle(&self, message: &TaskMessage, ctx: &HandlerContext) -> Result<TaskResult> {
        run_poll_cycle(
            self.spec(),
            self.repository.as_ref(),
            self.provider.as_ref(),
            message,
            ctx,
        )
        .await
    }
}

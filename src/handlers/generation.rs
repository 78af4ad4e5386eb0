//! Poll handler for image and video generation jobs.
//!
//! The generation provider (a Replicate-style prediction API) settles
//! asynchronously; each tick checks the prediction keyed by the handle on
//! the generation record. The poll budget is 120 ticks at the 5 second
//! cadence, a 10 minute ceiling.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PollConfig;
use crate::error::Result;
use crate::messaging::TaskMessage;

use super::poll::{run_poll_cycle, OperationRepository, PollSpec, StatusProvider};
use super::{HandlerContext, TaskHandler, TaskResult};

/// Task type this handler is registered under.
pub const GENERATION_POLL_TASK_TYPE: &str = "generation_poll";

/// Polls a pending generation job until the provider settles it.
///
/// `task_data` contract: `generation_id`, `user_id`, optional `poll_count`.
pub struct GenerationPollHandler {
    repository: Arc<dyn OperationRepository>,
    provider: Arc<dyn StatusProvider>,
    max_polls: u32,
}

impl GenerationPollHandler {
    pub fn new(
        repository: Arc<dyn OperationRepository>,
        provider: Arc<dyn StatusProvider>,
        config: &PollConfig,
    ) -> Self {
        Self {
            repository,
            provider,
            max_polls: config.generation_max_polls,
        }
    }

    fn spec(&self) -> PollSpec {
        PollSpec {
            task_type: GENERATION_POLL_TASK_TYPE,
            id_field: "generation_id",
            max_polls: self.max_polls,
        }
    }
}

#[async_trait]
impl TaskHandler for GenerationPollHandler {
    fn task_type(&self) -> &str {
        GENERATION_POLL_TASK_TYPE
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

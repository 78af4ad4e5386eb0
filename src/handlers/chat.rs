//! Poll handler for long-running chat completions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PollConfig;
use crate::error::Result;
use crate::messaging::TaskMessage;

use super::poll::{run_poll_cycle, OperationRepository, PollSpec, StatusProvider};
use super::{HandlerContext, TaskHandler, TaskResult};

/// Task type this handler is registered under.
pub const CHAT_COMPLETION_POLL_TASK_TYPE: &str = "chat_completion_poll";

/// Polls a pending background chat completion until the provider settles it.
///
/// `task_data` contract: `completion_id`, `user_id`, optional `poll_count`.
pub struct ChatCompletionPollHandler {
    repository: Arc<dyn OperationRepository>,
    provider: Arc<dyn StatusProvider>,
    max_polls: u32,
}

impl ChatCompletionPollHandler {
    pub fn new(
        repository: Arc<dyn OperationRepository>,
        provider: Arc<dyn StatusProvider>,
        config: &PollConfig,
    ) -> Self {
        Self {
            repository,
            provider,
            max_polls: config.chat_max_polls,
        }
    }

    fn spec(&self) -> PollSpec {
        PollSpec {
            task_type: CHAT_COMPLETION_POLL_TASK_TYPE,
            id_field: "completion_id",
            max_polls: self.max_polls,
        }
    }
}

#[async_trait]
impl TaskHandler for ChatCompletionPollHandler {
    fn task_type(&self) -> &str {
        CHAT_COMPLETION_POLL_TASK_TYPE
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

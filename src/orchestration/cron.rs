//! # Cron Dispatcher
//!
//! Maps cron schedule identifiers to one-shot eligibility scans. Each scan is
//! gated by a configuration toggle: disabled branches log and return without
//! side effects, and an unknown identifier warns and does nothing. Failure
//! for one subject never aborts the scan for the others.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::CreatedBy;

use super::enqueuer::{NewTaskRequest, TaskEnqueuer};

/// Cron identifier for the nightly memory synthesis scan.
pub const NIGHTLY_MEMORY_SYNTHESIS: &str = "nightly_memory_synthesis";

/// Task type enqueued for each eligible synthesis subject.
pub const MEMORY_SYNTHESIS_TASK_TYPE: &str = "memory_synthesis";

/// Aggregate result of one cron invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronOutcome {
    pub identifier: String,
    /// Subjects successfully scheduled.
    pub scheduled: usize,
}

/// A bounded "scan and enqueue" routine bound to one cron identifier.
#[async_trait]
pub trait EligibilityScan: Send + Sync {
    /// The cron identifier this scan answers to.
    fn identifier(&self) -> &str;

    /// Whether the branch is enabled for this process.
    fn is_enabled(&self, config: &EngineConfig) -> bool;

    /// Candidate subjects to evaluate.
    async fn candidates(&self) -> Result<Vec<String>>;

    /// Per-subject eligibility decision.
    async fn is_eligible(&self, subject: &str) -> Result<bool>;

    /// Task definition to enqueue for an eligible subject.
    fn build_request(&self, subject: &str) -> NewTaskRequest;
}

/// Closed dispatch table from cron identifier to scan.
pub struct CronDispatcher {
    enqueuer: Arc<TaskEnqueuer>,
    config: Arc<EngineConfig>,
    scans: HashMap<String, Arc<dyn EligibilityScan>>,
}

impl CronDispatcher {
    pub fn new(enqueuer: Arc<TaskEnqueuer>, config: Arc<EngineConfig>) -> Self {
        Self {
            enqueuer,
            config,
            scans: HashMap::new(),
        }
    }

    /// Register a scan under its identifier during wiring.
    pub fn register_scan(&mut self, scan: Arc<dyn EligibilityScan>) {
        self.scans.insert(scan.identifier().to_string(), scan);
    }

    /// Respond to one cron fire.
    pub async fn respond(&self, identifier: &str) -> Result<CronOutcome> {
        let Some(scan) = self.scans.get(identifier) else {
            warn!(identifier, "unknown cron identifier; no action taken");
            return Ok(CronOutcome {
                identifier: identifier.to_string(),
                scheduled: 0,
            });
        };

        if !scan.is_enabled(&self.config) {
            info!(identifier, "cron branch disabled; skipping");
            return Ok(CronOutcome {
                identifier: identifier.to_string(),
                scheduled: 0,
            });
        }

        let candidates = scan.candidates().await?;
        let total = candidates.len();
        let mut scheduled = 0usize;

        for subject in candidates {
            match self.schedule_subject(scan.as_ref(), &subject).await {
                Ok(true) => scheduled += 1,
                Ok(false) => {}
                Err(e) => {
                    // One bad subject must not starve the rest of the scan.
                    warn!(
                        identifier,
                        subject = %subject,
                        error = %e,
                        "cron scan failed for subject"
                    );
                }
            }
        }

        info!(identifier, candidates = total, scheduled, "cron scan complete");
        Ok(CronOutcome {
            identifier: identifier.to_string(),
            scheduled,
        })
    }

    async fn schedule_subject(&self, scan: &dyn EligibilityScan, subject: &str) -> Result<bool> {
        if !scan.is_eligible(subject).await? {
            return Ok(false);
        }
        self.enqueuer.enqueue(scan.build_request(subject)).await?;
        Ok(true)
    }
}

/// External source of synthesis candidates: which users have the feature on
/// and how much unsynthesized material each has accumulated.
#[async_trait]
pub trait SynthesisCandidateSource: Send + Sync {
    async fn users_with_synthesis_enabled(&self) -> Result<Vec<String>>;

    /// New memory items for a user since their last synthesis run.
    async fn new_memory_count(&self, user_id: &str) -> Result<u64>;
}

/// Nightly scan that enqueues a synthesis task for every user with enough
/// new memory items.
pub struct MemorySynthesisScan {
    source: Arc<dyn SynthesisCandidateSource>,
    min_new_memories: u32,
}

impl MemorySynthesisScan {
    pub fn new(source: Arc<dyn SynthesisCandidateSource>, min_new_memories: u32) -> Self {
        Self {
            source,
            min_new_memories,
        }
    }
}

#[async_trait]
impl EligibilityScan for MemorySynthesisScan {
    fn identifier(&self) -> &str {
        NIGHTLY_MEMORY_SYNTHESIS
    }

    fn is_enabled(&self, config: &EngineConfig) -> bool {
        config.cron.memory_synthesis_enabled
    }

    async fn candidates(&self) -> Result<Vec<String>> {
        self.source.users_with_synthesis_enabled().await
    }

    async fn is_eligible(&self, subject: &str) -> Result<bool> {
        let count = self.source.new_memory_count(subject).await?;
        Ok(count >= u64::from(self.min_new_memories))
    }

    fn build_request(&self, subject: &str) -> NewTaskRequest {
        NewTaskRequest::new(
            MEMORY_SYNTHESIS_TASK_TYPE,
            json!({ "user_id": subject }),
        )
        .with_user(subject)
        .with_created_by(CreatedBy::System)
    }
}

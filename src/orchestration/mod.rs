//! # Orchestration
//!
//! The scheduling core: the enqueuer creates rows and hands messages to the
//! broker, the queue consumer drains deliveries and owns transport-level
//! retry, the task runner owns the per-task lifecycle and domain-level
//! attempts, and the cron dispatcher materializes recurring scans.

pub mod consumer;
pub mod cron;
pub mod enqueuer;
pub mod runner;

pub use consumer::QueueConsumer;
pub use cron::{
    CronDispatcher, CronOutcome, EligibilityScan, MemorySynthesisScan, SynthesisCandidateSource,
};
pub use enqueuer::{NewTaskRequest, TaskEnqueuer};
pub use runner::TaskRunner;

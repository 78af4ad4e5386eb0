#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskflow Core
//!
//! Durable, at-least-once background task execution engine: callers enqueue
//! units of work (a task type plus an opaque payload), a queue consumer
//! dispatches them to typed handlers, and a family of handlers implements a
//! recurring "poll an external long-running operation until it settles"
//! pattern.
//!
//! ## Architecture
//!
//! ```text
//! Enqueuer -> Store (row) -> Broker (message) -> Queue Consumer
//!          -> Task Runner -> Handler Registry -> Handler
//!          -> (Store update, optional Broker re-send)
//! ```
//!
//! Two independent retry layers are reconciled here and must never be
//! merged: the broker's redelivery counter (did the *delivery* fail) and the
//! task row's `attempts` column (did the *business logic* fail). Both cap
//! at 3 by default; they answer different questions.
//!
//! ## Module Organization
//!
//! - [`models`] - Task and execution rows, status enums
//! - [`store`] - Persistence contract and the Postgres implementation
//! - [`messaging`] - Wire message, broker contract, pgmq implementation
//! - [`registry`] - Closed task-type to handler table
//! - [`orchestration`] - Enqueuer, queue consumer, task runner, cron dispatcher
//! - [`handlers`] - Handler trait and the poll-reconcile-requeue family
//! - [`config`] - Typed configuration and per-task-type feature flags
//! - [`error`] - Structured error handling
//!
//! ## Delivery Semantics
//!
//! At-least-once, never exactly-once: handlers must be idempotent or
//! tolerate duplicate side effects. There is no distributed consensus and no
//! cross-node locking; concurrency safety rests on the broker's visibility
//! window plus last-writer-wins row updates.

pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod store;

pub use config::{EngineConfig, FeatureFlags};
pub use error::{EngineError, Result};
pub use handlers::{HandlerContext, TaskHandler, TaskResult, TaskResultStatus};
pub use messaging::{Delivery, MessageBroker, TaskMessage};
pub use models::{Task, TaskExecution, TaskStatus};
pub use orchestration::{CronDispatcher, NewTaskRequest, QueueConsumer, TaskEnqueuer, TaskRunner};
pub use registry::HandlerRegistry;
pub use store::TaskStore;

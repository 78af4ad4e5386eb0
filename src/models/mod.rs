//! # Data Model
//!
//! Durable rows for the task engine: the [`Task`] row is the source of truth
//! for a unit of work, and [`TaskExecution`] rows form an append-only audit
//! trail of every handler invocation attempt.

pub mod task;
pub mod task_execution;

pub use task::{CreatedBy, NewTask, ScheduleType, Task, TaskStatus, TaskUpdate};
pub use task_execution::{ExecutionStatus, ExecutionUpdate, TaskExecution};

//! # Task Store Contract
//!
//! All persistence flows through the [`TaskStore`] trait; the engine core
//! never issues raw queries. The shipped implementation is
//! [`PgTaskStore`](postgres::PgTaskStore); tests substitute an in-memory
//! store behind the same trait.

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExecutionStatus, ExecutionUpdate, NewTask, Task, TaskExecution, TaskUpdate};

pub use postgres::PgTaskStore;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Database query error: {operation}: {message}")]
    DatabaseQuery { operation: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Row decode error: {message}")]
    Decode { message: String },
}

impl StoreError {
    /// Create a database connection error
    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }

    /// Create a database query error
    pub fn database_query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DatabaseQuery {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::database_query("query", "No rows found"),
            sqlx::Error::Database(db_err) => {
                StoreError::database_query("database", db_err.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => StoreError::Decode {
                message: format!("column {index}: {source}"),
            },
            _ => StoreError::database_connection(err.to_string()),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract consumed by the engine core.
///
/// `create_task_execution` returns `None` when the backing store cannot
/// produce the audit row; the task runner then falls back to a freshly
/// generated execution id so attempt timing can still be recorded.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, new_task: NewTask) -> StoreResult<Task>;

    async fn update_task(&self, id: Uuid, update: TaskUpdate) -> StoreResult<()>;

    async fn get_task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn get_tasks_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Task>>;

    async fn create_task_execution(
        &self,
        task_id: Uuid,
        status: ExecutionStatus,
    ) -> StoreResult<Option<TaskExecution>>;

    async fn update_task_execution(&self, id: Uuid, update: ExecutionUpdate) -> StoreResult<()>;
}

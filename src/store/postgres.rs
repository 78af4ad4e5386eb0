//! # Postgres Task Store
//!
//! SQLx-backed implementation of the [`TaskStore`] contract. Queries are
//! runtime-checked (`sqlx::query_as`) so the crate builds without a live
//! database; the schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, StoreResult, TaskStore};
use crate::models::{ExecutionStatus, ExecutionUpdate, NewTask, Task, TaskExecution, TaskUpdate};

const TASK_COLUMNS: &str = "id, task_type, user_id, task_data, schedule_type, scheduled_at, \
     cron_expression, priority, status, attempts, max_attempts, error_message, created_by, \
     metadata, created_at, last_attempted_at, completed_at";

/// Postgres-backed task store.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations. Safe to call on every startup.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::database_query("migrate", e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_task(&self, new_task: NewTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (id, task_type, user_id, task_data, schedule_type, scheduled_at, \
             cron_expression, priority, status, attempts, max_attempts, created_by, metadata, \
             created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'queued', 0, $9, $10, $11, $12) \
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_task.task_type)
            .bind(&new_task.user_id)
            .bind(&new_task.task_data)
            .bind(new_task.schedule_type.as_str())
            .bind(new_task.scheduled_at)
            .bind(&new_task.cron_expression)
            .bind(new_task.priority)
            .bind(new_task.max_attempts)
            .bind(new_task.created_by.as_str())
            .bind(&new_task.metadata)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        debug!(task_id = %task.id, task_type = %task.task_type, "task row created");
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, update: TaskUpdate) -> StoreResult<()> {
        // error_message carries an explicit apply flag so it can be cleared
        // without being clobbered by unrelated updates.
        let (apply_error, error_message) = match update.error_message {
            Some(value) => (true, value),
            None => (false, None),
        };

        let result = sqlx::query(
            "UPDATE tasks SET \
               status = COALESCE($2, status), \
               attempts = COALESCE($3, attempts), \
               error_message = CASE WHEN $4 THEN $5 ELSE error_message END, \
               last_attempted_at = COALESCE($6, last_attempted_at), \
               completed_at = COALESCE($7, completed_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.attempts)
        .bind(apply_error)
        .bind(error_message)
        .bind(update.last_attempted_at)
        .bind(update.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", id));
        }
        Ok(())
    }

    async fn get_task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn get_tasks_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn create_task_execution(
        &self,
        task_id: Uuid,
        status: ExecutionStatus,
    ) -> StoreResult<Option<TaskExecution>> {
        let execution = sqlx::query_as::<_, TaskExecution>(
            "INSERT INTO task_executions (id, task_id, status, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, task_id, status, duration_ms, error_message, result_data, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(execution))
    }

    async fn update_task_execution(&self, id: Uuid, update: ExecutionUpdate) -> StoreResult<()> {
        // Rows are append-only once finalized: only running rows may change.
        sqlx::query(
            "UPDATE task_executions SET \
               status = COALESCE($2, status), \
               duration_ms = COALESCE($3, duration_ms), \
               error_message = COALESCE($4, error_message), \
               result_data = COALESCE($5, result_data) \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.duration_ms)
        .bind(update.error_message)
        .bind(update.result_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

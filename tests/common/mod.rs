//! Shared test doubles: in-memory store and broker, scripted handlers, and
//! fake poll collaborators. Everything implements the same traits the
//! production wiring uses, so tests exercise the real orchestration paths.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use taskflow_core::config::EngineConfig;
use taskflow_core::error::{EngineError, Result};
use taskflow_core::handlers::poll::{
    OperationPhase, OperationRecord, OperationRepository, ProviderStatus, StatusProvider,
};
use taskflow_core::handlers::{HandlerContext, TaskHandler, TaskResult};
use taskflow_core::messaging::{Delivery, MessageBroker, MessagingError, MessagingResult, TaskMessage};
use taskflow_core::models::{
    ExecutionStatus, ExecutionUpdate, NewTask, Task, TaskExecution, TaskStatus, TaskUpdate,
};
use taskflow_core::orchestration::cron::SynthesisCandidateSource;
use taskflow_core::orchestration::{TaskEnqueuer, TaskRunner};
use taskflow_core::registry::HandlerRegistry;
use taskflow_core::store::{StoreError, StoreResult, TaskStore};

/// In-memory task store mirroring the Postgres implementation's semantics,
/// including the append-only guard on finalized execution rows.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<Uuid, Task>>,
    executions: Mutex<Vec<TaskExecution>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self, id: Uuid) -> Option<Task> {
        self.tasks.lock().get(&id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.lock().values().cloned().collect()
    }

    /// Execution rows for a task, in creation order.
    pub fn executions_for(&self, task_id: Uuid) -> Vec<TaskExecution> {
        self.executions
            .lock()
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, new_task: NewTask) -> StoreResult<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            task_type: new_task.task_type,
            user_id: new_task.user_id,
            task_data: new_task.task_data,
            schedule_type: new_task.schedule_type,
            scheduled_at: new_task.scheduled_at,
            cron_expression: new_task.cron_expression,
            priority: new_task.priority,
            status: TaskStatus::Queued,
            attempts: 0,
            max_attempts: new_task.max_attempts,
            error_message: None,
            created_by: new_task.created_by,
            metadata: new_task.metadata,
            created_at: Utc::now(),
            last_attempted_at: None,
            completed_at: None,
        };
        self.tasks.lock().insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, update: TaskUpdate) -> StoreResult<()> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("task", id))?;

        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(attempts) = update.attempts {
            task.attempts = attempts;
        }
        if let Some(error_message) = update.error_message {
            task.error_message = error_message;
        }
        if let Some(at) = update.last_attempted_at {
            task.last_attempted_at = Some(at);
        }
        if let Some(at) = update.completed_at {
            task.completed_at = Some(at);
        }
        Ok(())
    }

    async fn get_task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tasks.lock().get(&id).cloned())
    }

    async fn get_tasks_by_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| t.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit as usize);
        Ok(tasks)
    }

    async fn create_task_execution(
        &self,
        task_id: Uuid,
        status: ExecutionStatus,
    ) -> StoreResult<Option<TaskExecution>> {
        let execution = TaskExecution {
            id: Uuid::new_v4(),
            task_id,
            status,
            duration_ms: None,
            error_message: None,
            result_data: None,
            created_at: Utc::now(),
        };
        self.executions.lock().push(execution.clone());
        Ok(Some(execution))
    }

    async fn update_task_execution(&self, id: Uuid, update: ExecutionUpdate) -> StoreResult<()> {
        let mut executions = self.executions.lock();
        if let Some(execution) = executions
            .iter_mut()
            .find(|e| e.id == id && e.status == ExecutionStatus::Running)
        {
            if let Some(status) = update.status {
                execution.status = status;
            }
            if let Some(duration_ms) = update.duration_ms {
                execution.duration_ms = Some(duration_ms);
            }
            if let Some(error_message) = update.error_message {
                execution.error_message = Some(error_message);
            }
            if let Some(result_data) = update.result_data {
                execution.result_data = Some(result_data);
            }
        }
        Ok(())
    }
}

/// One message handed to the broker, with its delay if any.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: TaskMessage,
    pub delay: Option<Duration>,
}

/// In-memory broker recording sends, acks, and retries. Tests that exercise
/// the consumer push deliveries in directly with a chosen attempts count.
#[derive(Default)]
pub struct InMemoryBroker {
    sent: Mutex<Vec<SentMessage>>,
    pending: Mutex<VecDeque<Delivery>>,
    acked: Mutex<Vec<i64>>,
    retried: Mutex<Vec<i64>>,
    fail_sends: AtomicBool,
    next_message_id: AtomicI64,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail, simulating an unavailable broker.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn push_delivery(&self, delivery: Delivery) {
        self.pending.lock().push_back(delivery);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn acked(&self) -> Vec<i64> {
        self.acked.lock().clone()
    }

    pub fn retried(&self) -> Vec<i64> {
        self.retried.lock().clone()
    }

    fn record_send(&self, message: &TaskMessage, delay: Option<Duration>) -> MessagingResult<i64> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MessagingError::connection("broker offline"));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().push(SentMessage {
            message: message.clone(),
            delay,
        });
        Ok(message_id)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn send(&self, message: &TaskMessage) -> MessagingResult<i64> {
        self.record_send(message, None)
    }

    async fn send_delayed(&self, message: &TaskMessage, delay: Duration) -> MessagingResult<i64> {
        self.record_send(message, Some(delay))
    }

    async fn receive_batch(&self, limit: i32) -> MessagingResult<Vec<Delivery>> {
        let mut pending = self.pending.lock();
        let count = (limit as usize).min(pending.len());
        Ok(pending.drain(..count).collect())
    }

    async fn ack(&self, delivery: &Delivery) -> MessagingResult<()> {
        self.acked.lock().push(delivery.message_id);
        Ok(())
    }

    async fn retry(&self, delivery: &Delivery) -> MessagingResult<()> {
        self.retried.lock().push(delivery.message_id);
        Ok(())
    }
}

/// One scripted handler step.
#[derive(Debug, Clone)]
pub enum HandlerScript {
    Succeed,
    SucceedWith(serde_json::Value),
    Skip(String),
    /// Return `Err(EngineError::Handler(..))`.
    FailWith(String),
    /// Return `Ok(TaskResult::error(..))`.
    ErrorResult(String),
}

/// Handler that plays back a script, one step per invocation; once the
/// script is exhausted it succeeds.
pub struct ScriptedHandler {
    task_type: String,
    script: Mutex<VecDeque<HandlerScript>>,
    calls: AtomicUsize,
}

impl ScriptedHandler {
    pub fn sequence(task_type: impl Into<String>, steps: Vec<HandlerScript>) -> Self {
        Self {
            task_type: task_type.into(),
            script: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_succeed(task_type: impl Into<String>) -> Self {
        Self::sequence(task_type, vec![])
    }

    pub fn always_fail(task_type: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        // Deep enough for any retry-exhaustion test.
        let steps = (0..16).map(|_| HandlerScript::FailWith(message.clone())).collect();
        Self::sequence(task_type, steps)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for ScriptedHandler {
    fn task_type(&self) -> &str {
        &self.task_type
    }

    async fn handle(&self, _message: &TaskMessage, _ctx: &HandlerContext) -> Result<TaskResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(HandlerScript::Succeed);
        match step {
            HandlerScript::Succeed => Ok(TaskResult::success()),
            HandlerScript::SucceedWith(data) => Ok(TaskResult::success_with_data(data)),
            HandlerScript::Skip(message) => Ok(TaskResult::skipped(message)),
            HandlerScript::FailWith(message) => Err(EngineError::handler(message)),
            HandlerScript::ErrorResult(message) => Ok(TaskResult::error(message)),
        }
    }
}

/// In-memory operation repository for poll handler tests.
#[derive(Default)]
pub struct FakeOperationRepository {
    records: Mutex<HashMap<String, OperationRecord>>,
    successes: Mutex<Vec<(String, serde_json::Value)>>,
    failures: Mutex<Vec<(String, String)>>,
}

impl FakeOperationRepository {
    pub fn with_record(record: OperationRecord) -> Self {
        let repo = Self::default();
        repo.records
            .lock()
            .insert(record.operation_id.clone(), record);
        repo
    }

    pub fn record(&self, operation_id: &str) -> Option<OperationRecord> {
        self.records.lock().get(operation_id).cloned()
    }

    pub fn successes(&self) -> Vec<(String, serde_json::Value)> {
        self.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().clone()
    }
}

#[async_trait]
impl OperationRepository for FakeOperationRepository {
    async fn load(&self, operation_id: &str) -> Result<Option<OperationRecord>> {
        Ok(self.records.lock().get(operation_id).cloned())
    }

    async fn record_success(&self, operation_id: &str, result: &serde_json::Value) -> Result<()> {
        if let Some(record) = self.records.lock().get_mut(operation_id) {
            record.phase = OperationPhase::Succeeded;
        }
        self.successes
            .lock()
            .push((operation_id.to_string(), result.clone()));
        Ok(())
    }

    async fn record_failure(&self, operation_id: &str, error: &str) -> Result<()> {
        if let Some(record) = self.records.lock().get_mut(operation_id) {
            record.phase = OperationPhase::Failed;
        }
        self.failures
            .lock()
            .push((operation_id.to_string(), error.to_string()));
        Ok(())
    }
}

/// Provider that always reports the configured status.
pub struct FakeStatusProvider {
    status: Mutex<ProviderStatus>,
    supports_polling: bool,
}

impl FakeStatusProvider {
    pub fn reporting(status: ProviderStatus) -> Self {
        Self {
            status: Mutex::new(status),
            supports_polling: true,
        }
    }

    pub fn without_polling_support() -> Self {
        Self {
            status: Mutex::new(ProviderStatus::InProgress),
            supports_polling: false,
        }
    }
}

#[async_trait]
impl StatusProvider for FakeStatusProvider {
    fn supports_status_polling(&self) -> bool {
        self.supports_polling
    }

    async fn operation_status(&self, _handle: &str) -> Result<ProviderStatus> {
        Ok(self.status.lock().clone())
    }
}

/// Synthesis candidate source with fixed users and per-user counts; a count
/// entry of `Err` simulates a per-subject lookup failure.
pub struct FakeSynthesisSource {
    users: Vec<String>,
    counts: HashMap<String, std::result::Result<u64, String>>,
}

impl FakeSynthesisSource {
    pub fn new(counts: Vec<(&str, std::result::Result<u64, String>)>) -> Self {
        Self {
            users: counts.iter().map(|(u, _)| u.to_string()).collect(),
            counts: counts
                .into_iter()
                .map(|(u, c)| (u.to_string(), c))
                .collect(),
        }
    }
}

#[async_trait]
impl SynthesisCandidateSource for FakeSynthesisSource {
    async fn users_with_synthesis_enabled(&self) -> Result<Vec<String>> {
        Ok(self.users.clone())
    }

    async fn new_memory_count(&self, user_id: &str) -> Result<u64> {
        match self.counts.get(user_id) {
            Some(Ok(count)) => Ok(*count),
            Some(Err(message)) => Err(EngineError::handler(message.clone())),
            None => Ok(0),
        }
    }
}

/// Fully wired engine over in-memory doubles.
pub struct TestEngine {
    pub store: Arc<InMemoryTaskStore>,
    pub broker: Arc<InMemoryBroker>,
    pub registry: Arc<HandlerRegistry>,
    pub enqueuer: Arc<TaskEnqueuer>,
    pub runner: Arc<TaskRunner>,
    pub config: Arc<EngineConfig>,
    pub context: HandlerContext,
}

/// Engine config with the given task types feature-enabled.
pub fn test_config(enabled_types: &[&str]) -> EngineConfig {
    let mut config = EngineConfig::default();
    for task_type in enabled_types {
        config.flags.enable(task_type);
    }
    config
}

pub fn build_engine(config: EngineConfig) -> TestEngine {
    let store = Arc::new(InMemoryTaskStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let registry = Arc::new(HandlerRegistry::new());
    let config = Arc::new(config);

    let enqueuer = Arc::new(TaskEnqueuer::new(store.clone(), broker.clone()));
    let context = HandlerContext::new(enqueuer.clone(), config.clone());
    let runner = Arc::new(TaskRunner::new(store.clone(), registry.clone(), context.clone()));

    TestEngine {
        store,
        broker,
        registry,
        enqueuer,
        runner,
        config,
        context,
    }
}

/// Record in the in-flight phase with the given owner.
pub fn processing_record(operation_id: &str, owner: &str) -> OperationRecord {
    OperationRecord {
        operation_id: operation_id.to_string(),
        owner_id: Some(owner.to_string()),
        provider_handle: format!("handle-{operation_id}"),
        phase: OperationPhase::Processing,
    }
}

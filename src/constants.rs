//! Engine-wide constants and defaults.
//!
//! Transport-level and domain-level retry caps both sit at 3, but they gate
//! different failures (delivery vs business logic) and are tracked in
//! different places (broker read count vs the `attempts` column).

/// Default priority assigned to new tasks when the caller does not set one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Default domain-level retry cap (`Task.max_attempts`).
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Broker-level redelivery cap. Once a message has been delivered this many
/// times without an ack, the consumer dead-letters the task instead of
/// retrying again.
pub const MAX_DELIVERY_ATTEMPTS: i32 = 3;

/// Default queue the engine consumes from.
pub const DEFAULT_QUEUE_NAME: &str = "taskflow_tasks";

/// Default number of messages pulled per consumer batch.
pub const DEFAULT_BATCH_SIZE: i32 = 10;

/// Default pgmq visibility timeout. An un-acked message becomes visible
/// again after this window, which is what "retry" means at the transport
/// layer.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i32 = 30;

/// Default delay between poll-reconcile-requeue ticks.
pub const DEFAULT_POLL_REQUEUE_DELAY_SECONDS: i64 = 5;

/// Default user task listing page size.
pub const DEFAULT_USER_TASKS_LIMIT: i64 = 50;

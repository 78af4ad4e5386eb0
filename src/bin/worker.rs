//! Queue worker binary: wires the store, broker, registry, and consumer,
//! then drains the task queue until ctrl-c.
//!
//! Handler registration is deliberately explicit and happens here, nowhere
//! else: the set of task types a worker process serves is fixed at startup.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::info;

use taskflow_core::config::load_config;
use taskflow_core::logging::init_structured_logging;
use taskflow_core::messaging::PgmqBroker;
use taskflow_core::orchestration::{QueueConsumer, TaskEnqueuer, TaskRunner};
use taskflow_core::registry::HandlerRegistry;
use taskflow_core::store::PgTaskStore;
use taskflow_core::HandlerContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = Arc::new(load_config().context("failed to load configuration")?);
    if config.database.url.is_empty() {
        anyhow::bail!("database url is not configured (set DATABASE_URL or TASKFLOW__DATABASE__URL)");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool)
        .connect(&config.database.url)
        .await
        .context("failed to connect to postgres")?;

    let store = PgTaskStore::new(pool);
    store.migrate().await.context("failed to run migrations")?;

    let broker = PgmqBroker::new(
        &config.database.url,
        config.queue.queue_name.clone(),
        config.queue.visibility_timeout_seconds,
    )
    .await
    .context("failed to connect to pgmq")?;
    broker.ensure_queue().await.context("failed to create queue")?;

    let store: Arc<dyn taskflow_core::TaskStore> = Arc::new(store);
    let broker: Arc<dyn taskflow_core::MessageBroker> = Arc::new(broker);

    let enqueuer = Arc::new(TaskEnqueuer::new(store.clone(), broker.clone()));
    let context = HandlerContext::new(enqueuer, config.clone());

    // Register handlers for every task type this worker serves. Poll
    // handlers need their repository/provider collaborators injected here;
    // the engine ships the scheduling core only.
    let registry = Arc::new(HandlerRegistry::new());

    info!(
        task_types = ?registry.registered_types(),
        queue = %config.queue.queue_name,
        "worker starting"
    );

    let runner = Arc::new(TaskRunner::new(store, registry, context));
    let consumer = QueueConsumer::new(broker, runner, &config.queue);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    consumer.run(shutdown_rx).await;
    Ok(())
}

//! # Structured Logging
//!
//! Environment-aware structured logging with a console layer and a JSON file
//! layer under `log/`, for debugging long-running consumer loops after the
//! fact.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging. Idempotent; the first call wins.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        if fs::create_dir_all(&log_dir).is_err() {
            // No file layer if the directory cannot be created; console only.
            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_filter(EnvFilter::new(log_level)),
                )
                .try_init();
            return None;
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let file_appender = tracing_appender::rolling::never(
            &log_dir,
            format!("{environment}.{pid}.{timestamp}.log"),
        );
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level)),
            )
            .try_init();

        Some(guard)
    });
}

fn get_environment() -> String {
    std::env::var("TASKFLOW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    if let Ok(level) = std::env::var("RUST_LOG") {
        return level;
    }

    match environment {
        "production" => "info".to_string(),
        "test" => "warn".to_string(),
        _ => "debug".to_string(),
    }
}

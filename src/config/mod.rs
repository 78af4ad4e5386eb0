//! # Engine Configuration
//!
//! Typed configuration for every subsystem, loaded once at startup. Two
//! sources: an optional config file merged with `TASKFLOW__*` environment
//! overrides (see [`loader`]), and the per-task-type feature flag table
//! captured from `*_ENABLED` environment variables by
//! [`FeatureFlags::from_env`]. After startup nothing reads the environment;
//! the runner consults the typed flag table only.

pub mod flags;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_REQUEUE_DELAY_SECONDS,
    DEFAULT_QUEUE_NAME, DEFAULT_VISIBILITY_TIMEOUT_SECONDS, MAX_DELIVERY_ATTEMPTS,
};

pub use flags::FeatureFlags;
pub use loader::load_config;

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub cron: CronConfig,
    /// Per-task-type feature flags. Not read from the config file; populated
    /// from the environment during startup wiring.
    #[serde(default)]
    pub flags: FeatureFlags,
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool: default_pool_size(),
        }
    }
}

/// Broker and consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: i32,
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: i32,
    #[serde(default = "default_idle_poll_interval_ms")]
    pub idle_poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            batch_size: default_batch_size(),
            visibility_timeout_seconds: default_visibility_timeout(),
            max_delivery_attempts: default_max_delivery_attempts(),
            idle_poll_interval_ms: default_idle_poll_interval_ms(),
        }
    }
}

/// Task runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: default_max_attempts(),
        }
    }
}

/// Poll-reconcile-requeue ceilings and cadence.
///
/// The per-provider maxima bound how long a remote operation may stay
/// in-flight: 120 polls at 5s is a 10 minute budget, 240 is 20 minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_requeue_delay")]
    pub requeue_delay_seconds: i64,
    #[serde(default = "default_generation_max_polls")]
    pub generation_max_polls: u32,
    #[serde(default = "default_research_max_polls")]
    pub research_max_polls: u32,
    #[serde(default = "default_chat_max_polls")]
    pub chat_max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            requeue_delay_seconds: default_poll_requeue_delay(),
            generation_max_polls: default_generation_max_polls(),
            research_max_polls: default_research_max_polls(),
            chat_max_polls: default_chat_max_polls(),
        }
    }
}

/// Cron dispatcher toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    #[serde(default)]
    pub memory_synthesis_enabled: bool,
    #[serde(default = "default_min_new_memories")]
    pub min_new_memories: u32,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            memory_synthesis_enabled: false,
            min_new_memories: default_min_new_memories(),
        }
    }
}

fn default_pool_size() -> u32 {
    5
}

fn default_queue_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}

fn default_batch_size() -> i32 {
    DEFAULT_BATCH_SIZE
}

fn default_visibility_timeout() -> i32 {
    DEFAULT_VISIBILITY_TIMEOUT_SECONDS
}

fn default_max_delivery_attempts() -> i32 {
    MAX_DELIVERY_ATTEMPTS
}

fn default_idle_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> i32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_poll_requeue_delay() -> i64 {
    DEFAULT_POLL_REQUEUE_DELAY_SECONDS
}

fn default_generation_max_polls() -> u32 {
    120
}

fn default_research_max_polls() -> u32 {
    240
}

fn default_chat_max_polls() -> u32 {
    120
}

fn default_min_new_memories() -> u32 {
    5
}

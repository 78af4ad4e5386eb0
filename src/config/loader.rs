//! Configuration loading: optional file plus environment overrides.
//!
//! File lookup is `config/taskflow.{toml,yaml,json}` relative to the working
//! directory; every field can also be set with a `TASKFLOW__`-prefixed
//! variable using `__` as the section separator
//! (`TASKFLOW__QUEUE__BATCH_SIZE=25`). Feature flags are layered on
//! afterwards from their own `*_ENABLED` convention.

use config::{Config, Environment, File};

use super::{EngineConfig, FeatureFlags};
use crate::error::{EngineError, Result};

/// Load engine configuration and capture feature flags from the environment.
pub fn load_config() -> Result<EngineConfig> {
    let mut engine_config: EngineConfig = Config::builder()
        .add_source(File::with_name("config/taskflow").required(false))
        .add_source(Environment::with_prefix("TASKFLOW").separator("__"))
        .build()
        .map_err(|e| EngineError::configuration(e.to_string()))?
        .try_deserialize()
        .map_err(|e| EngineError::configuration(e.to_string()))?;

    engine_config.flags = FeatureFlags::from_env();

    if engine_config.database.url.is_empty() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            engine_config.database.url = url;
        }
    }

    Ok(engine_config)
}

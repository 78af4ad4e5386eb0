//! # Feature Flags
//!
//! Per-task-type enablement, captured once at startup. The environment
//! convention is one boolean variable per task type: uppercase the type,
//! replace spaces with underscores, append `_ENABLED`
//! (`generation_poll` -> `GENERATION_POLL_ENABLED`). A task type with no
//! flag set is disabled; the runner skips it and the message is acked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Typed snapshot of per-task-type enablement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    enabled: HashMap<String, bool>,
}

impl FeatureFlags {
    /// Capture every `*_ENABLED` environment variable.
    pub fn from_env() -> Self {
        let enabled = std::env::vars()
            .filter(|(key, _)| key.ends_with("_ENABLED"))
            .map(|(key, value)| (key, is_truthy(&value)))
            .collect();

        Self { enabled }
    }

    /// Normalize a task type into its flag key.
    pub fn flag_key(task_type: &str) -> String {
        format!("{}_ENABLED", task_type.trim().to_uppercase().replace(' ', "_"))
    }

    /// Whether the task type is enabled. Unset flags count as disabled.
    pub fn is_enabled(&self, task_type: &str) -> bool {
        self.enabled
            .get(&Self::flag_key(task_type))
            .copied()
            .unwrap_or(false)
    }

    /// Enable a task type programmatically (wiring and tests).
    pub fn enable(&mut self, task_type: &str) {
        self.enabled.insert(Self::flag_key(task_type), true);
    }

    /// Disable a task type programmatically.
    pub fn disable(&mut self, task_type: &str) {
        self.enabled.insert(Self::flag_key(task_type), false);
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

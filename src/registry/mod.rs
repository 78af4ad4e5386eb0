//! # Handler Registry
//!
//! Explicit registration table from task type to handler, built once per
//! process during wiring. The set of registered types is closed after
//! startup: resolution is a plain map lookup, no reflection and no dynamic
//! discovery.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::handlers::TaskHandler;

/// Registry of task handlers keyed by task type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own task type. Registering the same type
    /// twice replaces the previous handler and warns; wiring code should not
    /// do that.
    pub fn register(&self, handler: Arc<dyn TaskHandler>) {
        let task_type = handler.task_type().to_string();
        let previous = self.handlers.write().insert(task_type.clone(), handler);

        if previous.is_some() {
            warn!(task_type = %task_type, "handler registration replaced an existing handler");
        } else {
            debug!(task_type = %task_type, "handler registered");
        }
    }

    /// Resolve the handler for a task type.
    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.read().get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.read().contains_key(task_type)
    }

    /// Registered task types, sorted for stable logging.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered_types", &self.registered_types())
            .finish()
    }
}

//! # Engine Error Types
//!
//! Structured error handling using thiserror instead of `Box<dyn Error>`
//! patterns. One variant per failure class from the engine's taxonomy:
//! validation and authorization errors fail fast inside handlers, transient
//! errors propagate so the attempts machinery runs, poll timeouts are
//! deliberately surfaced as errors to force attempt exhaustion, and
//! transport errors are handled a layer above the runner.

use thiserror::Error;

use crate::messaging::MessagingError;
use crate::store::StoreError;

/// Errors surfaced by the engine core and its handlers.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("No handler registered for task type: {task_type}")]
    HandlerNotFound { task_type: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Provider error: {operation}: {message}")]
    Provider { operation: String, message: String },

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authorization error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a provider error for a named provider operation
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a handler error
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

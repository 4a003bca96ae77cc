//! Error types for queue and configuration operations.
//!
//! Queue operations have exactly one failure mode: mutating a queue that has
//! already been destroyed. The rejected value is handed back to the caller
//! inside [`QueueError::Destroyed`] so nothing is silently dropped.
//! Delivery (`next`) never errors; it returns `None` on a destroyed queue.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a value cannot be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError<T> {
    /// The queue has been destroyed; the value is returned to the caller.
    Destroyed(T),
}

impl<T> QueueError<T> {
    /// Returns the value that failed to be enqueued.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            QueueError::Destroyed(value) => value,
        }
    }

    /// Maps the rejected value, keeping the variant.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueueError<U> {
        match self {
            QueueError::Destroyed(value) => QueueError::Destroyed(f(value)),
        }
    }
}

impl<T> fmt::Display for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Destroyed(_) => f.write_str("queue has been destroyed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for QueueError<T> {}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {var}: {message}")]
    Env { var: String, message: String },
}

impl ConfigError {
    /// Create a validation error for a specific field
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Invalid { field: field.into(), message: message.into() }
    }

    /// Create an environment variable error
    pub fn env<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::Env { var: var.into(), message: message.into() }
    }
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

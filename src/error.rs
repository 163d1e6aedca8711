//! Error types for remote query execution and session configuration.

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by query execution, key derivation and configuration.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Client-only operation attempted outside its valid context: {0}")]
    ClientUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Application {
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// Only transport failures are worth retrying; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Transport(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QueryError::Configuration(_) | QueryError::ClientUnavailable(_)
        )
    }
}

impl From<config::ConfigError> for QueryError {
    fn from(err: config::ConfigError) -> Self {
        QueryError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Serialization(err.to_string())
    }
}

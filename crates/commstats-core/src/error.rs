//! Error types for commstats.
//!
//! Sub-query failures are represented here so that every store call returns an
//! explicit `Result`. The aggregation service decides what a failure degrades
//! to; nothing in this module is ever shown to the dashboard directly.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the commstats library.
#[derive(Debug, Error)]
pub enum StatsError {
    // Remote store errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status returned by the store, if a response was received.
        status: Option<u16>,
    },

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Query task failed: {message}")]
    TaskFailed { message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for commstats operations.
pub type Result<T> = std::result::Result<T, StatsError>;

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<tokio::task::JoinError> for StatsError {
    fn from(err: tokio::task::JoinError) -> Self {
        StatsError::TaskFailed {
            message: err.to_string(),
        }
    }
}

impl StatsError {
    /// Shorthand for a transport failure without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        StatsError::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32000: remote store unavailable or slow
    /// - -32601: method not found
    /// - -32602: invalid params
    /// - -32603: internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            StatsError::Transport { .. } | StatsError::Timeout(_) => -32000,
            StatsError::MethodNotFound(_) => -32601,
            StatsError::InvalidParams { .. } => -32602,
            _ => -32603,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StatsError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Query timed out after 30s");

        let err = StatsError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(StatsError::transport("down").to_rpc_error_code(), -32000);
        assert_eq!(
            StatsError::InvalidParams {
                message: "collection".into()
            }
            .to_rpc_error_code(),
            -32602
        );
        assert_eq!(
            StatsError::MethodNotFound("shutdown".into()).to_rpc_error_code(),
            -32601
        );
        assert_eq!(StatsError::Other("boom".into()).to_rpc_error_code(), -32603);
    }
}

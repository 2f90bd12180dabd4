//! Error types for weir

use std::time::Duration;

use thiserror::Error;

/// Core error type for weir operations
#[derive(Error, Debug)]
pub enum WeirError {
    #[error("Connection create failed: {0}")]
    ConnectionCreate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Timed out after {0:?} waiting for a connection")]
    AcquireTimeout(Duration),

    #[error("Pool exhausted: {waiting} request(s) already waiting (limit {limit})")]
    PoolExhausted { waiting: usize, limit: usize },

    #[error("Query failed after {attempts} attempt(s): {message}")]
    Query { attempts: u32, message: String },

    #[error("Transaction failed: {message}")]
    Transaction {
        message: String,
        /// Set when the rollback itself also failed. Never replaces the
        /// original failure in `message`.
        rollback_error: Option<String>,
    },

    #[error("Pool is shutting down")]
    ShuttingDown,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for weir operations
pub type Result<T> = std::result::Result<T, WeirError>;

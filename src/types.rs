//! Error types shared across the gateway

use thiserror::Error;

/// Errors produced by the gateway
#[derive(Debug, Error)]
pub enum TaskwayError {
    /// Transport-level failure talking to the store
    #[error("store request failed: {0}")]
    Store(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("store rejected request ({status}): {body}")]
    StoreStatus { status: u16, body: String },

    /// JSON (de)serialization failure
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Malformed client request (bad body, bad path parameter)
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Realtime listener failure
    #[error("realtime listener error: {0}")]
    Realtime(String),

    /// Underlying I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, TaskwayError>;

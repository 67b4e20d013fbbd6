//! Common error types for webtarot

use thiserror::Error;

/// Common result type for webtarot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across webtarot crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local key-value store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

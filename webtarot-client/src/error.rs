//! Error types for the webtarot client

use std::time::Duration;
use thiserror::Error;
use webtarot_common::InterpretationResult;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
///
/// `Cancelled` is a normal outcome of a view going away and is never shown
/// to the user as a failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend unreachable or the connection dropped mid-request
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-success status; `message` is `HTTP <status>: <detail>`
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    /// The backend does not know this reading id
    #[error("Reading not found: {0}")]
    NotFound(String),

    /// Polling budget elapsed without a final result
    #[error("Polling interpretation timed out after {elapsed:?}")]
    Timeout {
        last: Box<InterpretationResult>,
        elapsed: Duration,
    },

    #[error("Cancelled")]
    Cancelled,

    /// Push channel closed or failed before the completion notice
    #[error("Push channel disconnected: {0}")]
    PushDisconnected(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Common(#[from] webtarot_common::Error),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Failure of the push channel itself, recoverable by polling or refresh
    pub fn is_push_failure(&self) -> bool {
        matches!(
            self,
            ClientError::PushDisconnected(_) | ClientError::WebSocket(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(e.to_string())
    }
}

use serde::Serialize;
use thiserror::Error;

/// Result type for Music Assistant operations
pub type Result<T> = std::result::Result<T, MaError>;

/// Failure classes surfaced to the calling assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InvalidMedia,
    ConnectionError,
    AuthError,
    RemoteRejected,
    PartialFailure,
    ConfigError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidMedia => "InvalidMedia",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::RemoteRejected => "RemoteRejected",
            ErrorKind::PartialFailure => "PartialFailure",
            ErrorKind::ConfigError => "ConfigError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of a multi-step operation that did not reach its target state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    pub target: String,
    pub reason: String,
}

/// Errors that can occur when talking to a Music Assistant server
#[derive(Error, Debug)]
pub enum MaError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Request timed out waiting for response
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Reconnection gave up after the configured number of attempts
    #[error("Could not connect after {attempts} attempt(s): {last}")]
    ConnectFailed { attempts: u32, last: String },

    /// Server rejected the credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Bad or conflicting tool arguments
    #[error("Invalid argument `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Identifier does not resolve to a live entity
    #[error("{0}")]
    NotFound(String),

    /// Identifier matches more than one live entity
    #[error("`{reference}` is ambiguous, matches: {}", .candidates.join(", "))]
    Ambiguous {
        reference: String,
        candidates: Vec<String>,
    },

    /// Media reference the server cannot play
    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    /// Server understood the request but refused it
    #[error("Server rejected request (code {code}): {detail}")]
    Rejected { code: i64, detail: String },

    /// Some steps of a multi-step operation failed
    #[error("{summary}")]
    PartialFailure {
        summary: String,
        succeeded: Vec<String>,
        failed: Vec<FailedStep>,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unexpected response from the server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or malformed process configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MaError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map an error to the assistant-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            MaError::WebSocket(_)
            | MaError::ConnectionClosed
            | MaError::Timeout(_)
            | MaError::ConnectFailed { .. } => ErrorKind::ConnectionError,
            MaError::Auth(_) => ErrorKind::AuthError,
            MaError::Validation { .. } => ErrorKind::ValidationError,
            MaError::NotFound(_) | MaError::Ambiguous { .. } => ErrorKind::NotFound,
            MaError::InvalidMedia(_) => ErrorKind::InvalidMedia,
            MaError::Rejected { .. } | MaError::Json(_) | MaError::InvalidResponse(_) => {
                ErrorKind::RemoteRejected
            }
            MaError::PartialFailure { .. } => ErrorKind::PartialFailure,
            MaError::Config(_) => ErrorKind::ConfigError,
        }
    }

    /// Transport-level failures invalidate the session they happened on
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MaError::WebSocket(_)
                | MaError::ConnectionClosed
                | MaError::Timeout(_)
                | MaError::ConnectFailed { .. }
        )
    }
}

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the query client can report.
///
/// Server-declared errors, decode failures and transport failures all arrive
/// as this one type, so callers have a single error channel to handle.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("top_k must be between 1 and 10, got {0}")]
    InvalidTopK(u8),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected the request with a non-success status.
    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// An `error` event from the stream; displayed verbatim.
    #[error("{0}")]
    Server(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Timed out {0}")]
    Timeout(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl QueryError {
    /// Check if this error was raised locally before any network activity.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::EmptyQuestion | Self::InvalidTopK(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

use thiserror::Error;

/// Reasons a session operation is refused before anything changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("A question is already being answered")]
    Busy,

    /// The request was refused locally before reaching the server.
    #[error("{0}")]
    InvalidRequest(String),
}

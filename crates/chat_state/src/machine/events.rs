//! Chat events - Defines events that trigger phase transitions

use serde::{Deserialize, Serialize};

/// Defines the events that can move a question through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEvent {
    // ========== User Events ==========
    /// User submitted a question that passed the entry guard.
    QuestionSubmitted,

    /// User (or the owning context) cancelled the in-flight question.
    StreamCancelled,

    // ========== Stream Events ==========
    /// The query request was accepted and the event stream is open.
    StreamOpened,

    /// An answer fragment was applied.
    TokenReceived,

    /// The citation set was applied.
    SourcesReceived,

    /// The server signalled completion.
    StreamCompleted,

    /// The stream failed (server error, transport or decode failure).
    StreamFailed { error: String },

    // ========== Session Events ==========
    /// The settled question was acknowledged; the session accepts input again.
    Reset,
}

impl ChatEvent {
    /// Check if this event is user-initiated.
    pub fn is_user_event(&self) -> bool {
        matches!(self, Self::QuestionSubmitted | Self::StreamCancelled)
    }

    /// Check if this event ends a question.
    pub fn is_terminal_event(&self) -> bool {
        matches!(
            self,
            Self::StreamCompleted | Self::StreamFailed { .. } | Self::StreamCancelled
        )
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuestionSubmitted => "question_submitted",
            Self::StreamCancelled => "stream_cancelled",
            Self::StreamOpened => "stream_opened",
            Self::TokenReceived => "token_received",
            Self::SourcesReceived => "sources_received",
            Self::StreamCompleted => "stream_completed",
            Self::StreamFailed { .. } => "stream_failed",
            Self::Reset => "reset",
        }
    }
}

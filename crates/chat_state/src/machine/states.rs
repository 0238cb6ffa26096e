//! Chat phases - Defines the lifecycle states of one question

use serde::{Deserialize, Serialize};

/// How a question ended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettleOutcome {
    /// The server sent `done`; the answer is final.
    Success,
    /// The placeholder was rolled back and the error recorded.
    Failed { error: String },
    /// The caller cancelled; the placeholder was rolled back.
    Cancelled,
}

/// Defines the phases a chat session moves through for each question.
///
/// `Idle → Sending → Streaming → Settled → Idle`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    /// Awaiting a question.
    #[default]
    Idle,

    /// Optimistic entries are in the transcript; the request is being issued.
    Sending,

    /// Events are being applied to the placeholder.
    Streaming {
        /// Number of token events applied so far.
        tokens: usize,
    },

    /// The question has ended.
    Settled { outcome: SettleOutcome },
}

impl ChatPhase {
    /// Check if a new question may be admitted.
    pub fn accepts_user_input(&self) -> bool {
        matches!(self, Self::Idle | Self::Settled { .. })
    }

    /// Check if a stream is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming { .. })
    }

    /// Get a human-readable description of the current phase.
    pub fn description(&self) -> &str {
        match self {
            Self::Idle => "Ready for input",
            Self::Sending => "Sending question",
            Self::Streaming { .. } => "Receiving answer",
            Self::Settled {
                outcome: SettleOutcome::Success,
            } => "Answered",
            Self::Settled {
                outcome: SettleOutcome::Failed { .. },
            } => "Failed",
            Self::Settled {
                outcome: SettleOutcome::Cancelled,
            } => "Cancelled",
        }
    }
}

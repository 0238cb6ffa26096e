//! State transitions - FSM transition logic
//!
//! Implements the phase machine that handles event-driven transitions.

use thiserror::Error;

use super::events::ChatEvent;
use super::states::{ChatPhase, SettleOutcome};

/// Error type for invalid phase transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} with event {event}")]
    InvalidTransition { from: ChatPhase, event: String },
}

/// Represents a phase transition result.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The phase before the transition.
    pub from: ChatPhase,
    /// The phase after the transition.
    pub to: ChatPhase,
    /// The event that triggered the transition.
    pub event: ChatEvent,
    /// Whether the phase actually changed.
    pub changed: bool,
}

/// State machine for the question lifecycle.
#[derive(Debug, Clone)]
pub struct StateMachine {
    /// Current phase.
    current: ChatPhase,
    /// Transition history (limited).
    history: Vec<StateTransition>,
    /// Max history entries to keep.
    max_history: usize,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine in Idle phase.
    pub fn new() -> Self {
        Self::with_phase(ChatPhase::Idle)
    }

    /// Create a state machine with a specific initial phase.
    pub fn with_phase(phase: ChatPhase) -> Self {
        Self {
            current: phase,
            history: Vec::new(),
            max_history: 50,
        }
    }

    /// Get the current phase.
    pub fn phase(&self) -> &ChatPhase {
        &self.current
    }

    /// Get the transition history.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Handle an event, rejecting events the current phase does not accept.
    ///
    /// A rejected event leaves the phase and the history untouched.
    pub fn try_handle_event(&mut self, event: ChatEvent) -> Result<StateTransition, TransitionError> {
        let Some(next) = Self::compute_next_phase(&self.current, &event) else {
            return Err(TransitionError::InvalidTransition {
                from: self.current.clone(),
                event: event.name().to_string(),
            });
        };
        Ok(self.record(next, event))
    }

    /// Handle an event; events the current phase does not accept are recorded
    /// as unchanged transitions.
    pub fn handle_event(&mut self, event: ChatEvent) -> StateTransition {
        let next = Self::compute_next_phase(&self.current, &event)
            .unwrap_or_else(|| self.current.clone());
        self.record(next, event)
    }

    fn record(&mut self, next: ChatPhase, event: ChatEvent) -> StateTransition {
        let from = std::mem::replace(&mut self.current, next.clone());
        let changed = from != next;

        tracing::trace!(from = ?from, to = ?next, event = event.name(), "chat phase transition");

        let transition = StateTransition {
            from,
            to: next,
            event,
            changed,
        };

        // Add to history
        self.history.push(transition.clone());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        transition
    }

    /// Compute the next phase given current phase and event.
    fn compute_next_phase(phase: &ChatPhase, event: &ChatEvent) -> Option<ChatPhase> {
        use ChatEvent::*;
        use ChatPhase::*;

        let next = match (phase, event) {
            // ========== Admission ==========
            (Idle | Settled { .. }, QuestionSubmitted) => Sending,

            // ========== Streaming ==========
            (Sending, StreamOpened) => Streaming { tokens: 0 },
            (Streaming { tokens }, TokenReceived) => Streaming { tokens: tokens + 1 },
            (Streaming { tokens }, SourcesReceived) => Streaming { tokens: *tokens },

            // ========== Settlement ==========
            (Streaming { .. }, StreamCompleted) => Settled {
                outcome: SettleOutcome::Success,
            },
            (Sending | Streaming { .. }, StreamFailed { error }) => Settled {
                outcome: SettleOutcome::Failed {
                    error: error.clone(),
                },
            },
            (Sending | Streaming { .. }, StreamCancelled) => Settled {
                outcome: SettleOutcome::Cancelled,
            },

            // ========== Back to Idle ==========
            (Settled { .. } | Idle, Reset) => Idle,

            _ => return None,
        };

        Some(next)
    }

    /// Check if a transition is valid without executing it.
    pub fn can_transition(&self, event: &ChatEvent) -> bool {
        Self::compute_next_phase(&self.current, event).is_some()
    }

    /// Reset to Idle phase.
    pub fn reset(&mut self) {
        self.current = ChatPhase::Idle;
    }
}

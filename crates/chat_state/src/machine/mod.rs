//! State machine module
//!
//! Contains the FSM implementation for the question lifecycle.

mod events;
mod states;
mod transitions;

pub use events::ChatEvent;
pub use states::{ChatPhase, SettleOutcome};
pub use transitions::{StateMachine, StateTransition, TransitionError};

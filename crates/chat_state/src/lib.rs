//! chat_state - Session state store and FSM logic for the document chat
//!
//! This crate provides the pure state transitions over the chat transcript
//! and the phase machine that tracks one question from submission to settlement.

pub mod machine;
pub mod store;

// Re-export commonly used types
pub use machine::{ChatEvent, ChatPhase, SettleOutcome, StateMachine, StateTransition, TransitionError};
pub use store::ChatState;

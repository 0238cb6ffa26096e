//! Message module - Transcript entry types
//!
//! Shared message and citation types used across the system.

mod entry;
mod source;

pub use entry::{Message, MessagePatch, Role};
pub use source::Source;

//! chat_core - Core types and configuration for the document chat client
//!
//! This crate provides the foundational types shared by every other crate:
//! - `message` - transcript entries, roles and citation sources
//! - `config` - client configuration (server URL, retrieval depth, timeouts)
//! - `paths` - location of the per-user configuration directory

pub mod config;
pub mod message;
pub mod paths;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use message::{Message, MessagePatch, Role, Source};

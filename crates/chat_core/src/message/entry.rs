//! Message - One transcript entry
//!
//! Messages are created by the chat session. Only the most recent assistant
//! message is ever changed, and only while its answer is streaming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::source::Source;

/// Who authored a transcript entry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single entry of the chat transcript.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    /// Time-ordered unique id (UUIDv7), stable for rendering.
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Citations for an assistant answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content,
            timestamp: Utc::now(),
            sources: None,
        }
    }

    /// Create a user question.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Create an assistant message with final content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// Create the empty assistant entry that a streamed answer fills in.
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, String::new())
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Number of attached citations.
    pub fn source_count(&self) -> usize {
        self.sources.as_ref().map_or(0, Vec::len)
    }

    /// Return this message with `patch` merged in.
    ///
    /// Fields absent from the patch are kept; `sources` are replaced, not merged.
    #[must_use]
    pub fn merged(mut self, patch: MessagePatch) -> Self {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(sources) = patch.sources {
            self.sources = Some(sources);
        }
        self
    }
}

/// Partial update for the last transcript entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub sources: Option<Vec<Source>>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            sources: None,
        }
    }

    pub fn sources(sources: Vec<Source>) -> Self {
        Self {
            content: None,
            sources: Some(sources),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.sources.is_none()
    }
}

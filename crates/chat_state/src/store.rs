//! Chat state store - Pure transitions over the session snapshot
//!
//! Every transition consumes the current snapshot and returns the next one.
//! Keep a clone if the previous snapshot is still needed.

use chat_core::{Message, MessagePatch};
use serde::Serialize;

/// The single chat session: one document, one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatState {
    /// Transcript in display order.
    pub messages: Vec<Message>,
    /// A question is in flight.
    pub is_loading: bool,
    pub error: Option<String>,
    pub document_loaded: bool,
    /// Loaded document name; meaningful only when `document_loaded`.
    pub filename: Option<String>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new conversation over `filename`.
    #[must_use]
    pub fn set_document_loaded(self, filename: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            error: None,
            document_loaded: true,
            filename: Some(filename.into()),
            ..self
        }
    }

    /// Append a message. Ids are not checked for uniqueness.
    #[must_use]
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Merge `patch` into the last message; no-op on an empty transcript.
    #[must_use]
    pub fn update_last_message(mut self, patch: MessagePatch) -> Self {
        if let Some(last) = self.messages.pop() {
            self.messages.push(last.merged(patch));
        }
        self
    }

    /// Record a terminal error. Always clears `is_loading`.
    #[must_use]
    pub fn set_error(self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            is_loading: false,
            ..self
        }
    }

    #[must_use]
    pub fn clear_error(self) -> Self {
        Self { error: None, ..self }
    }

    #[must_use]
    pub fn set_loading(self, is_loading: bool) -> Self {
        Self { is_loading, ..self }
    }

    /// Empty the transcript and clear the error; the document stays loaded.
    #[must_use]
    pub fn clear_chat(self) -> Self {
        Self {
            messages: Vec::new(),
            error: None,
            ..self
        }
    }

    /// Drop the last message. Used only to roll back a failed answer.
    #[must_use]
    pub fn remove_last(mut self) -> Self {
        self.messages.pop();
        self
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

//! Source - Citation excerpts attached to assistant answers

use serde::{Deserialize, Serialize};

/// A retrieved chunk cited as evidence for an answer.
///
/// Sources have no identity beyond their position within a message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Source {
    /// Name of the document the excerpt was taken from.
    pub filename: String,
    /// 1-based page the excerpt starts on.
    pub page_number: u32,
    /// Excerpt text.
    pub content: String,
    /// Similarity score, conventionally within `0.0..=1.0`.
    pub relevance_score: f64,
    /// Position of the chunk in the document's chunk sequence.
    pub chunk_index: u32,
}

impl Source {
    /// Check whether the numeric fields satisfy the wire contract
    /// (page >= 1, score within `[0, 1]`).
    pub fn is_well_formed(&self) -> bool {
        self.page_number >= 1 && (0.0..=1.0).contains(&self.relevance_score)
    }

    /// Relevance as a whole percentage, for display.
    pub fn relevance_percent(&self) -> u32 {
        (self.relevance_score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

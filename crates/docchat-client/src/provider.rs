use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::QueryChunk;

/// Lazy, finite sequence of answer chunks for one question.
///
/// The stream ends after `Done`, after the first error, or when the
/// cancellation token passed to [`QueryProvider::query_stream`] fires.
pub type QueryStream = Pin<Box<dyn Stream<Item = Result<QueryChunk>> + Send>>;

#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Ask one question and stream the answer.
    ///
    /// # Arguments
    /// * `question` - The user's question; rejected locally if blank
    /// * `cancel` - Cancels the handshake and ends the returned stream
    async fn query_stream(&self, question: &str, cancel: &CancellationToken) -> Result<QueryStream>;
}

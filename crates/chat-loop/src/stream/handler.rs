use chat_core::Source;
use docchat_client::{QueryChunk, QueryStream};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// A change to apply to the answer being streamed.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerUpdate {
    /// Full answer text so far (all tokens, in arrival order).
    Content(String),
    /// Replacement citation set.
    Sources(Vec<Source>),
}

/// How consumption of a query stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    Completed,
    Failed(String),
    Cancelled,
}

pub struct StreamHandlingOutput {
    pub content: String,
    pub token_count: usize,
    pub end: StreamEnd,
}

/// Consume `stream` until it settles, reporting each applied change to `on_update`.
///
/// Nothing is reported after the first error, after `Done`, or once `cancel`
/// fires. A stream that ends without `Done` counts as failed unless it was
/// cancelled.
pub async fn consume_query_stream<F>(
    mut stream: QueryStream,
    cancel: &CancellationToken,
    mut on_update: F,
) -> StreamHandlingOutput
where
    F: FnMut(AnswerUpdate),
{
    let mut content = String::new();
    let mut token_count = 0usize;

    let end = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamEnd::Cancelled,
            next = stream.next() => next,
        };

        if cancel.is_cancelled() {
            break StreamEnd::Cancelled;
        }

        match next {
            Some(Ok(QueryChunk::Token(token))) => {
                token_count += 1;
                content.push_str(&token);
                on_update(AnswerUpdate::Content(content.clone()));
            }
            Some(Ok(QueryChunk::Sources(sources))) => {
                log::debug!("[chat] applying {} sources", sources.len());
                on_update(AnswerUpdate::Sources(sources));
            }
            Some(Ok(QueryChunk::Done)) => break StreamEnd::Completed,
            Some(Err(error)) if error.is_cancelled() => break StreamEnd::Cancelled,
            Some(Err(error)) => break StreamEnd::Failed(error.to_string()),
            None => {
                break StreamEnd::Failed("stream closed before completion".to_string());
            }
        }
    };

    StreamHandlingOutput {
        content,
        token_count,
        end,
    }
}

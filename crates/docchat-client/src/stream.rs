//! Drive a decoded event stream under cancellation and idle timeouts.

use std::time::Duration;

use futures::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::decoder::{decode_events, ProtocolEvent};
use crate::error::QueryError;
use crate::models::QueryChunk;
use crate::provider::QueryStream;

/// Turn a raw SSE body into a [`QueryStream`].
///
/// Server `error` events become [`QueryError::Server`]; transport failures,
/// idle timeouts and a body that closes before `done` become errors too. After
/// an error or `Done` the stream ends. Cancellation ends the stream without
/// yielding anything further and drops `body`, closing the connection.
pub fn query_stream_from_sse<S, B, E>(
    body: S,
    cancel: CancellationToken,
    idle_timeout: Duration,
) -> QueryStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut events = Box::pin(decode_events(body));
        let mut event_count = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("[query] stream cancelled after {} events", event_count);
                    break;
                }
                next = tokio::time::timeout(idle_timeout, events.next()) => next,
            };

            let event = match next {
                Err(_) => {
                    yield Err(QueryError::Timeout(format!(
                        "waiting {}s for the next stream event",
                        idle_timeout.as_secs()
                    )));
                    break;
                }
                Ok(None) => {
                    log::warn!("[query] stream closed after {} events without completion", event_count);
                    yield Err(QueryError::Transport("stream closed before completion".to_string()));
                    break;
                }
                Ok(Some(Err(err))) => {
                    yield Err(QueryError::Transport(err.to_string()));
                    break;
                }
                Ok(Some(Ok(event))) => event,
            };

            event_count += 1;
            match event {
                ProtocolEvent::Token(token) => yield Ok(QueryChunk::Token(token)),
                ProtocolEvent::Sources(sources) => {
                    log::debug!("[query] received {} sources", sources.len());
                    yield Ok(QueryChunk::Sources(sources));
                }
                ProtocolEvent::Done => {
                    log::debug!("[query] stream completed ({} events)", event_count);
                    yield Ok(QueryChunk::Done);
                    break;
                }
                ProtocolEvent::Error(message) => {
                    log::warn!("[query] server error: {}", message);
                    yield Err(QueryError::Server(message));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

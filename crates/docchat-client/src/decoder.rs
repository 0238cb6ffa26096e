//! Event-stream decoder: raw SSE bytes -> typed [`ProtocolEvent`]s.
//!
//! Record framing (blank-line terminated records, partial records and partial
//! UTF-8 sequences carried across chunk boundaries) is handled by
//! `eventsource-stream`; this module maps each complete record to a typed event
//! and enforces that `done` and `error` end the sequence.

use chat_core::Source;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::Stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One typed record of the query event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    Token(String),
    Sources(Vec<Source>),
    Done,
    /// Server-declared failure, or a record that could not be decoded.
    Error(String),
}

impl ProtocolEvent {
    /// Check if no further events may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenPayload {
    Wrapped { token: String },
    Bare(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourcesPayload {
    Wrapped { sources: Vec<Source> },
    Bare(Vec<Source>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Wrapped { error: String },
    Bare(String),
}

fn decode_payload<T: DeserializeOwned>(kind: &str, data: &str) -> Result<T, ProtocolEvent> {
    serde_json::from_str(data).map_err(|e| {
        log::warn!("[decoder] malformed {} record: {}", kind, e);
        ProtocolEvent::Error(format!("Failed to decode {kind} event: {e}"))
    })
}

/// Map one complete SSE record to a protocol event.
///
/// Returns `None` for event names outside the protocol.
pub fn parse_record(event: &str, data: &str) -> Option<ProtocolEvent> {
    let parsed = match event {
        "token" => decode_payload::<TokenPayload>(event, data).map(|payload| match payload {
            TokenPayload::Wrapped { token } | TokenPayload::Bare(token) => {
                ProtocolEvent::Token(token)
            }
        }),
        "sources" => {
            decode_payload::<SourcesPayload>(event, data).map(|payload| match payload {
                SourcesPayload::Wrapped { sources } | SourcesPayload::Bare(sources) => {
                    if let Some(bad) = sources.iter().find(|s| !s.is_well_formed()) {
                        log::warn!(
                            "[decoder] source outside wire bounds (page {}, score {})",
                            bad.page_number,
                            bad.relevance_score
                        );
                    }
                    ProtocolEvent::Sources(sources)
                }
            })
        }
        "done" => decode_payload::<serde_json::Value>(event, data).map(|_| ProtocolEvent::Done),
        "error" => decode_payload::<ErrorPayload>(event, data).map(|payload| match payload {
            ErrorPayload::Wrapped { error } | ErrorPayload::Bare(error) => {
                ProtocolEvent::Error(error)
            }
        }),
        other => {
            log::debug!("[decoder] skipping unknown event type {:?}", other);
            return None;
        }
    };

    Some(parsed.unwrap_or_else(|decode_error| decode_error))
}

/// Decode a raw byte stream into protocol events.
///
/// Chunk boundaries carry no meaning. Transport errors of `body` are passed
/// through as `Err` and end the sequence; framing and payload failures become
/// [`ProtocolEvent::Error`]. Nothing is yielded after `Done` or `Error`.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<ProtocolEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut records = Box::pin(body.eventsource());

        while let Some(record) = records.next().await {
            let event = match record {
                Ok(record) => match parse_record(&record.event, &record.data) {
                    Some(event) => event,
                    None => continue,
                },
                Err(EventStreamError::Transport(err)) => {
                    yield Err(err);
                    return;
                }
                Err(err) => ProtocolEvent::Error(format!("Failed to decode event stream: {err}")),
            };

            let terminal = event.is_terminal();
            yield Ok(event);
            if terminal {
                return;
            }
        }
    }
}

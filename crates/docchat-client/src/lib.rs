//! docchat-client - Talks to the document chat server
//!
//! - `decoder` - SSE bytes to typed protocol events
//! - `stream` - protocol events to answer chunks, with cancellation and timeouts
//! - `client` - HTTP client: streamed and buffered queries, upload, health

pub mod client;
pub mod decoder;
pub mod error;
pub mod models;
pub mod provider;
pub mod stream;

pub use client::DocumentChatClient;
pub use decoder::{decode_events, ProtocolEvent};
pub use error::QueryError;
pub use models::{DocumentUploadResponse, HealthResponse, QueryChunk, QueryRequest, QueryResponse};
pub use provider::{QueryProvider, QueryStream};
pub use stream::query_stream_from_sse;

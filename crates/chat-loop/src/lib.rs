//! chat-loop - Drives one question at a time through the chat session
//!
//! [`ChatSession::send_message`] validates the question, appends the
//! optimistic entries, consumes the answer stream and settles the transcript.

pub mod error;
pub mod session;
pub mod stream;

pub use error::ChatError;
pub use session::{ChatSession, SendOutcome};
pub use stream::{consume_query_stream, AnswerUpdate, StreamEnd, StreamHandlingOutput};

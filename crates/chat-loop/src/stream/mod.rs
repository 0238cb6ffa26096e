mod handler;

pub use handler::{consume_query_stream, AnswerUpdate, StreamEnd, StreamHandlingOutput};

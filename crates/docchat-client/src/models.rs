//! Wire types of the document chat HTTP API.

use chat_core::config::TOP_K_RANGE;
use chat_core::Source;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// Body of `POST /api/v1/query` and `POST /api/v1/query/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u8>,
}

impl QueryRequest {
    /// Build a validated request. The question is trimmed; empty questions and
    /// out-of-range `top_k` values are rejected locally.
    pub fn new(question: &str, top_k: Option<u8>) -> Result<Self> {
        let query = question.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        if let Some(k) = top_k {
            if !TOP_K_RANGE.contains(&k) {
                return Err(QueryError::InvalidTopK(k));
            }
        }
        Ok(Self {
            query: query.to_string(),
            top_k,
        })
    }
}

/// One step of an answer as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryChunk {
    /// Next answer fragment, append-only.
    Token(String),
    /// Full citation set for the answer; replaces any previous set.
    Sources(Vec<Source>),
    /// The answer is complete.
    Done,
}

/// Body returned by the buffered `POST /api/v1/query/sync` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl QueryResponse {
    /// Model the buffered answer as the equivalent streamed sequence.
    pub fn into_chunks(self) -> Vec<QueryChunk> {
        vec![
            QueryChunk::Token(self.answer),
            QueryChunk::Sources(self.sources),
            QueryChunk::Done,
        ]
    }
}

/// Body returned by `POST /api/v1/documents`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentUploadResponse {
    pub filename: String,
    #[serde(default)]
    pub file_type: String,
    pub total_chunks: u32,
    #[serde(default)]
    pub message: String,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub session_active: bool,
    #[serde(default)]
    pub document_loaded: bool,
    pub filename: Option<String>,
    pub page_count: Option<u32>,
    pub chunk_count: Option<u32>,
}

impl HealthResponse {
    /// Name of the document the server currently holds, if any.
    pub fn loaded_document(&self) -> Option<&str> {
        if self.document_loaded {
            self.filename.as_deref()
        } else {
            None
        }
    }
}

/// Error bodies: FastAPI's `{"detail": ...}` or `{"error": ..., "detail": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    error: Option<String>,
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Most specific human-readable message of an error response body.
    pub(crate) fn message_from(body: &str) -> String {
        let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
            return body.trim().to_string();
        };
        match (parsed.error, parsed.detail) {
            (_, Some(serde_json::Value::String(detail))) => detail,
            (Some(error), Some(detail)) => format!("{error}: {detail}"),
            (Some(error), None) => error,
            (None, Some(detail)) => detail.to_string(),
            (None, None) => body.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_and_validates() {
        let request = QueryRequest::new("  What is X?\n", Some(3)).unwrap();
        assert_eq!(request.query, "What is X?");
        assert_eq!(request.top_k, Some(3));

        assert!(matches!(
            QueryRequest::new(" \t\n", None),
            Err(QueryError::EmptyQuestion)
        ));
        assert!(matches!(
            QueryRequest::new("q", Some(0)),
            Err(QueryError::InvalidTopK(0))
        ));
        assert!(matches!(
            QueryRequest::new("q", Some(11)),
            Err(QueryError::InvalidTopK(11))
        ));
    }

    #[test]
    fn test_request_omits_missing_top_k() {
        let body = serde_json::to_value(QueryRequest::new("q", None).unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "query": "q" }));
    }

    #[test]
    fn test_sync_response_as_chunks() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"answer":"The answer is X.","sources":[]}"#).unwrap();
        let chunks = response.into_chunks();
        assert_eq!(
            chunks,
            vec![
                QueryChunk::Token("The answer is X.".to_string()),
                QueryChunk::Sources(vec![]),
                QueryChunk::Done,
            ]
        );
    }

    #[test]
    fn test_health_loaded_document() {
        let health: HealthResponse = serde_json::from_str(
            r#"{"status":"healthy","version":"0.1.0","session_active":true,"document_loaded":true,"filename":"report.pdf","page_count":12,"chunk_count":34}"#,
        )
        .unwrap();
        assert_eq!(health.loaded_document(), Some("report.pdf"));

        let idle: HealthResponse = serde_json::from_str(r#"{"status":"healthy"}"#).unwrap();
        assert_eq!(idle.loaded_document(), None);
    }

    #[test]
    fn test_error_body_messages() {
        assert_eq!(
            ErrorBody::message_from(r#"{"detail":"File size 25.0MB exceeds limit of 20MB"}"#),
            "File size 25.0MB exceeds limit of 20MB"
        );
        assert_eq!(
            ErrorBody::message_from(r#"{"error":"Validation error","detail":null}"#),
            "Validation error"
        );
        assert_eq!(ErrorBody::message_from("Bad Gateway\n"), "Bad Gateway");
    }
}

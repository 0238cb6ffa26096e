use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_core::Source;
use chat_loop::{ChatError, ChatSession, SendOutcome};
use chat_state::ChatPhase;
use docchat_client::{DocumentChatClient, QueryChunk, QueryError, QueryProvider, QueryStream};
use futures::stream::{self, StreamExt};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

enum Script {
    Chunks(Vec<Result<QueryChunk, QueryError>>),
    /// Yields the chunks and then never finishes.
    Stall(Vec<Result<QueryChunk, QueryError>>),
    Refuse(QueryError),
}

/// Replays one script per call and records the questions it was asked.
struct ScriptedProvider {
    scripts: Mutex<Vec<Script>>,
    questions: Mutex<Vec<String>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedProvider {
    fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            questions: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Announce on `started` and wait for `release` before answering.
    fn gated(scripts: Vec<Script>, started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((started, release)),
            ..Self::new(scripts)
        }
    }

    fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryProvider for ScriptedProvider {
    async fn query_stream(
        &self,
        question: &str,
        _cancel: &CancellationToken,
    ) -> Result<QueryStream, QueryError> {
        self.questions.lock().unwrap().push(question.to_string());
        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let script = self.scripts.lock().unwrap().remove(0);
        match script {
            Script::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks))),
            Script::Stall(chunks) => Ok(Box::pin(stream::iter(chunks).chain(stream::pending()))),
            Script::Refuse(error) => Err(error),
        }
    }
}

fn token(text: &str) -> Result<QueryChunk, QueryError> {
    Ok(QueryChunk::Token(text.to_string()))
}

fn source() -> Source {
    Source {
        filename: "report.pdf".to_string(),
        page_number: 3,
        content: "X is defined on page three.".to_string(),
        relevance_score: 0.87,
        chunk_index: 12,
    }
}

fn answered() -> Script {
    Script::Chunks(vec![
        token("The "),
        token("answer "),
        token("is X."),
        Ok(QueryChunk::Sources(vec![source()])),
        Ok(QueryChunk::Done),
    ])
}

fn session_with(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, ChatSession) {
    let provider = Arc::new(provider);
    let session = ChatSession::new(provider.clone());
    session.load_document("report.pdf").unwrap();
    (provider, session)
}

#[tokio::test]
async fn streamed_answer_lands_in_the_transcript() {
    let (provider, session) = session_with(ScriptedProvider::new(vec![answered()]));

    let outcome = session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    let state = session.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert!(state.messages[0].is_user());
    assert_eq!(state.messages[0].content, "What is X?");
    assert_eq!(state.messages[1].content, "The answer is X.");
    assert_eq!(state.messages[1].source_count(), 1);
    assert!(!state.is_loading);
    assert!(state.error.is_none());

    match outcome {
        SendOutcome::Answered(message) => assert_eq!(message, state.messages[1]),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(provider.questions(), vec!["What is X?".to_string()]);
    assert_eq!(session.phase(), ChatPhase::Idle);
}

#[tokio::test]
async fn server_error_rolls_back_the_answer() {
    let (_, session) = session_with(ScriptedProvider::new(vec![Script::Chunks(vec![
        token("Partial"),
        Err(QueryError::Server("model overloaded".to_string())),
    ])]));

    let outcome = session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, SendOutcome::Failed("model overloaded".to_string()));
    let state = session.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert!(state.messages[0].is_user());
    assert_eq!(state.error.as_deref(), Some("model overloaded"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn second_question_is_refused_while_the_first_is_in_flight() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (provider, session) = session_with(ScriptedProvider::gated(
        vec![answered()],
        started.clone(),
        release.clone(),
    ));
    let cancel = CancellationToken::new();

    let first = session.send_message("What is X?", &cancel);
    let second = async {
        started.notified().await;
        let before = session.snapshot();
        assert!(before.is_loading);

        let refused = session.send_message("And Y?", &cancel).await;
        assert_eq!(refused, Err(ChatError::Busy));
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.clear_chat(), Err(ChatError::Busy));
        assert_eq!(session.load_document("other.pdf"), Err(ChatError::Busy));
        assert_eq!(session.snapshot(), before);

        release.notify_one();
    };
    let (outcome, ()) = tokio::join!(first, second);

    assert!(matches!(outcome, Ok(SendOutcome::Answered(_))));
    assert_eq!(session.snapshot().messages.len(), 2);
    assert_eq!(provider.questions(), vec!["What is X?".to_string()]);
}

#[tokio::test]
async fn blank_question_changes_nothing() {
    let (provider, session) = session_with(ScriptedProvider::new(Vec::new()));
    let before = session.snapshot();

    let result = session.send_message("   \n", &CancellationToken::new()).await;

    assert_eq!(result, Err(ChatError::EmptyQuestion));
    assert_eq!(session.snapshot(), before);
    assert!(provider.questions().is_empty());
}

#[tokio::test]
async fn question_is_trimmed_before_sending() {
    let (provider, session) = session_with(ScriptedProvider::new(vec![answered()]));

    session
        .send_message("  What is X?  ", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.questions(), vec!["What is X?".to_string()]);
    assert_eq!(session.snapshot().messages[0].content, "What is X?");
}

#[tokio::test]
async fn refused_request_reports_the_transport_error() {
    let (_, session) = session_with(ScriptedProvider::new(vec![Script::Refuse(
        QueryError::Transport("connection refused".to_string()),
    )]));

    let outcome = session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    let expected = "Connection error: connection refused".to_string();
    assert_eq!(outcome, SendOutcome::Failed(expected.clone()));
    let state = session.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.error, Some(expected));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn stream_ending_without_done_is_a_failure() {
    let (_, session) = session_with(ScriptedProvider::new(vec![Script::Chunks(vec![token(
        "The ",
    )])]));

    let outcome = session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, SendOutcome::Failed(_)));
    let state = session.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn cancelling_mid_stream_removes_the_placeholder() {
    let (_, session) = session_with(ScriptedProvider::new(vec![Script::Stall(vec![token(
        "The ",
    )])]));
    let mut rx = session.subscribe();
    let cancel = CancellationToken::new();

    let send = session.send_message("What is X?", &cancel);
    let cancel_after_first_token = async {
        rx.wait_for(|state| {
            state
                .last_message()
                .map_or(false, |message| message.is_assistant() && !message.content.is_empty())
        })
        .await
        .unwrap();
        cancel.cancel();
    };
    let (outcome, ()) = tokio::join!(send, cancel_after_first_token);

    assert_eq!(outcome, Ok(SendOutcome::Cancelled));
    let state = session.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert!(state.error.is_none());
    assert!(!state.is_loading);
    assert_eq!(session.phase(), ChatPhase::Idle);
}

#[tokio::test]
async fn session_accepts_a_new_question_after_a_failure() {
    let (_, session) = session_with(ScriptedProvider::new(vec![
        Script::Refuse(QueryError::Server("model overloaded".to_string())),
        answered(),
    ]));
    let cancel = CancellationToken::new();

    session.send_message("What is X?", &cancel).await.unwrap();
    assert!(session.snapshot().error.is_some());

    let outcome = session.send_message("What is X?", &cancel).await.unwrap();

    assert!(matches!(outcome, SendOutcome::Answered(_)));
    let state = session.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.messages.len(), 3);
}

#[tokio::test]
async fn loading_a_document_starts_a_new_conversation() {
    let (_, session) = session_with(ScriptedProvider::new(vec![answered()]));
    session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    session.load_document("other.pdf").unwrap();

    let state = session.snapshot();
    assert!(state.is_empty());
    assert!(state.document_loaded);
    assert_eq!(state.filename.as_deref(), Some("other.pdf"));
}

#[tokio::test]
async fn clear_chat_keeps_the_document() {
    let (_, session) = session_with(ScriptedProvider::new(vec![answered()]));
    session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();

    session.clear_chat().unwrap();

    let state = session.snapshot();
    assert!(state.is_empty());
    assert_eq!(state.filename.as_deref(), Some("report.pdf"));
}

#[tokio::test]
async fn locally_refused_request_leaves_the_transcript_untouched() {
    let (_, session) = session_with(ScriptedProvider::new(vec![
        Script::Refuse(QueryError::InvalidTopK(11)),
        answered(),
    ]));
    let before = session.snapshot();

    let result = session
        .send_message("What is X?", &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(ChatError::InvalidRequest(
            "top_k must be between 1 and 10, got 11".to_string()
        ))
    );
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.phase(), ChatPhase::Idle);

    let outcome = session
        .send_message("What is X?", &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Answered(_)));
}

#[tokio::test]
async fn client_with_out_of_range_top_k_never_touches_the_transcript() {
    // Rejected before any request, so the address is never dialled.
    let client = DocumentChatClient::new("http://127.0.0.1:9").with_top_k(Some(11));
    let session = ChatSession::new(Arc::new(client));
    session.load_document("report.pdf").unwrap();
    let before = session.snapshot();

    let result = session
        .send_message("What is X?", &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ChatError::InvalidRequest(_))));
    assert_eq!(session.snapshot(), before);
}

/// Token sequences covering empty tokens, multibyte text, one long run and
/// many short tokens, plus a deterministic spread of generated sequences.
fn token_sequences() -> Vec<Vec<String>> {
    let mut cases: Vec<Vec<String>> = vec![
        vec![],
        vec![String::new()],
        vec![String::new(), "a".to_string(), String::new()],
        vec!["é".to_string(), "日本".to_string(), "🙂".to_string(), " über".to_string()],
        vec!["x".repeat(10_000)],
        (0..500).map(|i| ((b'a' + (i % 26) as u8) as char).to_string()).collect(),
        vec!["line one\n".to_string(), "\n".to_string(), "  line two".to_string()],
    ];

    let alphabet = ["", "a", "The ", "é", "日本語", "🙂", " ", "42", "\t", "answer."];
    for len in 1..=24 {
        let sequence: Vec<String> = (0..len)
            .map(|i| alphabet[(i * 7 + len * 3) % alphabet.len()].repeat(1 + (i + len) % 3))
            .collect();
        cases.push(sequence);
    }
    cases
}

#[tokio::test]
async fn final_content_is_the_concatenation_of_tokens() {
    for tokens in token_sequences() {
        let mut chunks: Vec<Result<QueryChunk, QueryError>> =
            tokens.iter().map(|t| Ok(QueryChunk::Token(t.clone()))).collect();
        chunks.push(Ok(QueryChunk::Done));
        let (_, session) = session_with(ScriptedProvider::new(vec![Script::Chunks(chunks)]));

        let outcome = session
            .send_message("What is X?", &CancellationToken::new())
            .await
            .unwrap();

        let expected: String = tokens.concat();
        match outcome {
            SendOutcome::Answered(message) => {
                assert_eq!(message.content, expected, "tokens {:?}", tokens)
            }
            other => panic!("unexpected outcome {:?} for tokens {:?}", other, tokens),
        }
        let state = session.snapshot();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, expected);
    }
}

#[tokio::test]
async fn refused_document_load_keeps_the_current_document() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let (_, session) = session_with(ScriptedProvider::gated(
        vec![answered()],
        started.clone(),
        release.clone(),
    ));

    let cancel = CancellationToken::new();
    let first = session.send_message("What is X?", &cancel);
    let second = async {
        started.notified().await;
        assert_eq!(session.load_document("other.pdf"), Err(ChatError::Busy));
        release.notify_one();
    };
    let (outcome, ()) = tokio::join!(first, second);

    assert!(matches!(outcome, Ok(SendOutcome::Answered(_))));
    assert_eq!(session.snapshot().filename.as_deref(), Some("report.pdf"));
}

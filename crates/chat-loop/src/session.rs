use std::sync::{Arc, Mutex, PoisonError};

use chat_core::{Message, MessagePatch};
use chat_state::{ChatEvent, ChatPhase, ChatState, StateMachine};
use docchat_client::{QueryError, QueryProvider};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ChatError;
use crate::stream::{consume_query_stream, AnswerUpdate, StreamEnd};

/// How an admitted question settled.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The server completed the answer; the final assistant message.
    Answered(Message),
    /// The placeholder was rolled back; the user-visible error text.
    Failed(String),
    /// The caller cancelled; the placeholder was rolled back.
    Cancelled,
}

/// Owns the chat session: the transcript, the in-flight gate and the
/// question lifecycle.
///
/// All state changes go through [`ChatState`] transitions applied here;
/// observers read snapshots via [`ChatSession::subscribe`].
pub struct ChatSession {
    provider: Arc<dyn QueryProvider>,
    state: watch::Sender<ChatState>,
    machine: Mutex<StateMachine>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn QueryProvider>) -> Self {
        let (state, _) = watch::channel(ChatState::new());
        Self {
            provider,
            state,
            machine: Mutex::new(StateMachine::new()),
        }
    }

    /// Current snapshot of the session.
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Receive every new snapshot as it is published.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn phase(&self) -> ChatPhase {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase()
            .clone()
    }

    /// Start a new conversation over a freshly uploaded document.
    pub fn load_document(&self, filename: impl Into<String>) -> Result<(), ChatError> {
        let filename = filename.into();
        self.apply_if_idle(|state| state.set_document_loaded(filename.clone()))?;
        log::info!("[chat] document loaded: {}", filename);
        Ok(())
    }

    /// Empty the transcript; the document stays loaded.
    pub fn clear_chat(&self) -> Result<(), ChatError> {
        self.apply_if_idle(ChatState::clear_chat).map(|_| ())
    }

    /// Ask `question` and stream its answer into the transcript.
    ///
    /// Rejected without any state change when the question is blank, another
    /// question is in flight, or the client refuses the request locally.
    /// Otherwise the user message and an empty assistant placeholder are
    /// appended before the request is issued, and the call returns once the
    /// answer has settled.
    pub async fn send_message(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let previous = self.apply_if_idle(|state| {
            state
                .add_message(Message::user(question))
                .add_message(Message::placeholder())
                .set_loading(true)
                .clear_error()
        })?;
        self.transition(ChatEvent::QuestionSubmitted);
        log::info!("[chat] question submitted ({} chars)", question.len());

        let stream = match self.provider.query_stream(question, cancel).await {
            Ok(stream) => stream,
            Err(QueryError::Cancelled) => return Ok(self.settle_cancelled()),
            Err(error) if error.is_precondition() => {
                log::warn!("[chat] request refused locally: {}", error);
                self.settle(ChatEvent::StreamFailed {
                    error: error.to_string(),
                });
                self.apply(|_| previous);
                return Err(ChatError::InvalidRequest(error.to_string()));
            }
            Err(error) => return Ok(self.settle_failed(error.to_string())),
        };
        self.transition(ChatEvent::StreamOpened);

        let output = consume_query_stream(stream, cancel, |update| self.apply_update(update)).await;
        log::debug!(
            "[chat] stream settled after {} tokens ({} chars)",
            output.token_count,
            output.content.len()
        );

        Ok(match output.end {
            StreamEnd::Completed => self.settle_completed(),
            StreamEnd::Failed(error) => self.settle_failed(error),
            StreamEnd::Cancelled => self.settle_cancelled(),
        })
    }

    fn apply<F>(&self, transition: F)
    where
        F: FnOnce(ChatState) -> ChatState,
    {
        self.state
            .send_modify(|state| *state = transition(std::mem::take(state)));
    }

    /// Apply `transition` only when no question is in flight; the check and
    /// the change happen under one lock. Returns the replaced snapshot.
    fn apply_if_idle<F>(&self, transition: F) -> Result<ChatState, ChatError>
    where
        F: FnOnce(ChatState) -> ChatState,
    {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            let current = std::mem::take(state);
            *state = transition(current.clone());
            previous = Some(current);
            true
        });

        if let Some(previous) = previous {
            Ok(previous)
        } else {
            log::debug!("[chat] rejected: a question is in flight");
            Err(ChatError::Busy)
        }
    }

    fn transition(&self, event: ChatEvent) {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = machine.try_handle_event(event) {
            log::warn!("[chat] {}", e);
        }
    }

    /// Record the terminal event and return to Idle before the gate reopens.
    fn settle(&self, terminal: ChatEvent) {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = machine.try_handle_event(terminal) {
            log::warn!("[chat] {}", e);
        }
        machine.handle_event(ChatEvent::Reset);
    }

    fn apply_update(&self, update: AnswerUpdate) {
        match update {
            AnswerUpdate::Content(content) => {
                self.apply(|state| state.update_last_message(MessagePatch::content(content)));
                self.transition(ChatEvent::TokenReceived);
            }
            AnswerUpdate::Sources(sources) => {
                self.apply(|state| state.update_last_message(MessagePatch::sources(sources)));
                self.transition(ChatEvent::SourcesReceived);
            }
        }
    }

    fn settle_completed(&self) -> SendOutcome {
        self.settle(ChatEvent::StreamCompleted);
        self.apply(|state| state.set_loading(false));

        let answer = self
            .state
            .borrow()
            .last_message()
            .cloned()
            .unwrap_or_else(Message::placeholder);
        log::info!("[chat] answered with {} sources", answer.source_count());
        SendOutcome::Answered(answer)
    }

    fn settle_failed(&self, error: String) -> SendOutcome {
        log::warn!("[chat] question failed: {}", error);
        self.settle(ChatEvent::StreamFailed {
            error: error.clone(),
        });
        let message = error.clone();
        self.apply(|state| state.set_error(message).remove_last());
        SendOutcome::Failed(error)
    }

    fn settle_cancelled(&self) -> SendOutcome {
        log::info!("[chat] question cancelled");
        self.settle(ChatEvent::StreamCancelled);
        self.apply(|state| state.remove_last().set_loading(false));
        SendOutcome::Cancelled
    }
}

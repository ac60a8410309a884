//! Conversation controller.
//!
//! Owns the timeline and the single pending-request slot. A submit appends
//! the user's turn right away, then races the backend call against a delayed
//! typing indicator: if the answer arrives first the indicator never shows.

pub mod copy;
pub mod message;
pub mod typing;

use crate::api::RagBackend;
use chrono::Utc;
use copy::CopyIndicator;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use typing::DelayedTask;
use uuid::Uuid;

pub use message::{Message, Role, Timeline, FALLBACK_REPLY};

pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What are the key concepts in artificial intelligence?",
    "Explain the RAG architecture in simple terms",
    "How does a vector database help with document retrieval?",
    "Compare different LLM models and their capabilities",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    EmptyQuery,
    /// Another query is still pending.
    Busy,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "camelCase")]
pub enum SubmitOutcome {
    Answered,
    Failed,
    Rejected(Rejection),
    /// The controller went away before the reply arrived.
    Discarded,
}

/// How the typing-indicator race ended for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TypingOutcome {
    /// The delay elapsed first; the indicator was visible until resolution.
    Shown,
    /// The reply arrived first; the indicator never appeared.
    Cancelled,
}

struct PendingRequest {
    id: Uuid,
    query: String,
    sent_at: Instant,
    timer: DelayedTask,
}

enum RequestState {
    Idle,
    Pending(PendingRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub messages: Vec<Message>,
    pub input: String,
    pub pending: bool,
    pub typing: bool,
}

struct ChatState {
    timeline: Timeline,
    input: String,
    request: RequestState,
    typing: bool,
    last_typing: Option<TypingOutcome>,
    mounted: bool,
}

impl ChatState {
    fn view(&self) -> ChatView {
        ChatView {
            messages: self.timeline.messages().to_vec(),
            input: self.input.clone(),
            pending: matches!(self.request, RequestState::Pending(_)),
            typing: self.typing,
        }
    }
}

#[derive(Clone)]
pub struct ChatController {
    backend: Arc<dyn RagBackend>,
    typing_delay: Duration,
    state: Arc<Mutex<ChatState>>,
    view_tx: Arc<watch::Sender<ChatView>>,
    copy: CopyIndicator,
}

impl ChatController {
    pub fn new(backend: Arc<dyn RagBackend>, typing_delay: Duration, copy_ack: Duration) -> Self {
        let state = ChatState {
            timeline: Timeline::default(),
            input: String::new(),
            request: RequestState::Idle,
            typing: false,
            last_typing: None,
            mounted: true,
        };
        let (view_tx, _) = watch::channel(state.view());
        Self {
            backend,
            typing_delay,
            state: Arc::new(Mutex::new(state)),
            view_tx: Arc::new(view_tx),
            copy: CopyIndicator::new(copy_ack),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Called with the lock held so observers never see snapshots out of order.
    fn publish(&self, state: &ChatState) {
        self.view_tx.send_replace(state.view());
    }

    pub fn snapshot(&self) -> ChatView {
        self.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view_tx.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().timeline.messages().to_vec()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.lock().request, RequestState::Pending(_))
    }

    /// The query currently awaiting an answer, if any.
    pub fn pending_query(&self) -> Option<String> {
        match &self.lock().request {
            RequestState::Pending(pending) => Some(pending.query.clone()),
            RequestState::Idle => None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.lock().typing
    }

    /// How the indicator race ended for the most recently resolved request.
    pub fn last_typing_outcome(&self) -> Option<TypingOutcome> {
        self.lock().last_typing
    }

    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    pub fn set_input(&self, text: &str) {
        let mut state = self.lock();
        state.input = text.to_string();
        self.publish(&state);
    }

    /// Put a starter question in the input without sending it.
    pub fn apply_suggestion(&self, index: usize) -> Option<&'static str> {
        let question = SUGGESTED_QUESTIONS.get(index).copied()?;
        self.set_input(question);
        Some(question)
    }

    /// Submit whatever is in the input buffer.
    pub async fn submit_input(&self) -> SubmitOutcome {
        let query = self.input();
        self.submit(&query).await
    }

    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        let request_id = {
            let mut state = self.lock();
            if !state.mounted {
                return SubmitOutcome::Rejected(Rejection::Unmounted);
            }
            if query.trim().is_empty() {
                return SubmitOutcome::Rejected(Rejection::EmptyQuery);
            }
            if let RequestState::Pending(pending) = &state.request {
                log::debug!("[chat] rejecting submit while {} is pending", pending.id);
                return SubmitOutcome::Rejected(Rejection::Busy);
            }

            state.timeline.push(Message::user(query, Utc::now()));
            state.input.clear();

            let id = Uuid::new_v4();
            let this = self.clone();
            let timer = DelayedTask::arm(self.typing_delay, move || this.show_typing(id));
            state.request = RequestState::Pending(PendingRequest {
                id,
                query: query.to_string(),
                sent_at: Instant::now(),
                timer,
            });
            self.publish(&state);
            id
        };

        log::info!("[chat] sending query {}", request_id);
        let result = self.backend.send_chat_message(query).await;

        let mut state = self.lock();
        if !state.mounted {
            log::debug!("[chat] discarding reply {} after unmount", request_id);
            return SubmitOutcome::Discarded;
        }
        let mut pending = match std::mem::replace(&mut state.request, RequestState::Idle) {
            RequestState::Pending(pending) if pending.id == request_id => pending,
            other => {
                state.request = other;
                log::debug!("[chat] discarding reply {} for stale request", request_id);
                return SubmitOutcome::Discarded;
            }
        };

        pending.timer.cancel();
        // A reply at exactly the delay still shows the indicator, even if the
        // timer task has not been polled yet.
        if !state.typing && pending.sent_at.elapsed() >= self.typing_delay {
            state.typing = true;
            self.publish(&state);
        }
        state.last_typing = Some(if state.typing {
            TypingOutcome::Shown
        } else {
            TypingOutcome::Cancelled
        });
        state.typing = false;

        let outcome = match result {
            Ok(reply) => {
                log::info!("[chat] reply {} received", request_id);
                state.timeline.push(Message::answer(reply));
                SubmitOutcome::Answered
            }
            Err(e) => {
                log::error!("[chat] query {} failed: {}", request_id, e);
                state.timeline.push(Message::failure(Utc::now()));
                SubmitOutcome::Failed
            }
        };
        self.publish(&state);
        outcome
    }

    fn show_typing(&self, request_id: Uuid) {
        let mut state = self.lock();
        let current = matches!(&state.request, RequestState::Pending(p) if p.id == request_id);
        if current && state.mounted {
            state.typing = true;
            self.publish(&state);
        }
    }

    /// Raw text of an assistant message for the clipboard. Also raises the
    /// transient "copied" acknowledgment for that message.
    pub fn copy_message(&self, index: usize) -> Option<String> {
        let content = {
            let state = self.lock();
            let message = state.timeline.get(index)?;
            if message.role != Role::Assistant {
                return None;
            }
            message.content.clone()
        };
        self.copy.acknowledge(index);
        Some(content)
    }

    pub fn copied(&self) -> Option<usize> {
        self.copy.copied()
    }

    pub fn subscribe_copied(&self) -> watch::Receiver<Option<usize>> {
        self.copy.subscribe()
    }

    /// Tear down: cancel the indicator and ignore any reply still in flight.
    pub fn unmount(&self) {
        let mut state = self.lock();
        state.mounted = false;
        state.typing = false;
        if let RequestState::Pending(mut pending) =
            std::mem::replace(&mut state.request, RequestState::Idle)
        {
            pending.timer.cancel();
        }
        self.publish(&state);
    }
}

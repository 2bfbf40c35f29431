//! Client-side chat session.
//!
//! DESIGN
//! ======
//! `ChatSession` is an explicit three-state machine:
//!
//! ```text
//!   Idle ──submit──▶ Sending ──ok──▶ Idle
//!                       │
//!                       └──err──▶ ErrorDisplayed ──submit──▶ Sending
//! ```
//!
//! The session owns its overlap guard: `submit` flips to `Sending` under the
//! lock before any network I/O, so a second `submit` racing the first sees
//! `Busy` instead of interleaving history appends. The lock is never held
//! across an await.
//!
//! Every transition publishes a fresh [`SessionView`] on a `watch` channel;
//! UI collaborators render from that and never touch the session internals.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use uuid::Uuid;

use crate::api::ChatApi;

/// Longest accepted prompt, in characters, after trimming. Mirrors the server.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Shown for every failed turn, whatever the cause.
pub const FAILURE_MESSAGE: &str = "Failed to generate a response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    ErrorDisplayed,
}

/// Snapshot of everything a UI needs to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub messages: Vec<Message>,
    /// Typing indicator; true exactly while a request is in flight.
    pub is_sending: bool,
    pub error: Option<String>,
}

/// Submissions refused before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("prompt exceeds {MAX_PROMPT_CHARS} characters")]
    TooLong,
    #[error("a message is already being sent")]
    Busy,
}

struct Inner {
    state: SessionState,
    messages: Vec<Message>,
    error: Option<String>,
    /// Cause of the most recent failed turn, for diagnostics only.
    last_failure: Option<String>,
}

impl Inner {
    fn view(&self) -> SessionView {
        SessionView {
            messages: self.messages.clone(),
            is_sending: self.state == SessionState::Sending,
            error: self.error.clone(),
        }
    }
}

pub struct ChatSession<A> {
    api: A,
    conversation_id: Uuid,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<SessionView>,
}

impl<A: ChatApi> ChatSession<A> {
    /// Start a fresh session with a newly generated conversation id.
    #[must_use]
    pub fn new(api: A) -> Self {
        let (view_tx, _) = watch::channel(SessionView::default());
        Self {
            api,
            conversation_id: Uuid::new_v4(),
            inner: Mutex::new(Inner { state: SessionState::Idle, messages: Vec::new(), error: None, last_failure: None }),
            view_tx,
        }
    }

    #[must_use]
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    /// Underlying cause of the last failed turn. The view only ever shows
    /// [`FAILURE_MESSAGE`]; this keeps the detail for diagnostics.
    #[must_use]
    pub fn last_failure(&self) -> Option<String> {
        self.lock().last_failure.clone()
    }

    /// Reactive view; a new value is published on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// Submit one prompt and wait for the turn to finish.
    ///
    /// A failed network round trip is not an `Err`: the session moves to
    /// `ErrorDisplayed`, keeps the user's message in history, and the caller
    /// may simply submit again.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when the prompt is rejected locally or another
    /// submission is still in flight. History is untouched in that case.
    pub async fn submit(&self, prompt: &str) -> Result<(), SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(SubmitError::TooLong);
        }

        let in_flight = self.begin_send(prompt)?;
        let outcome = self.api.send(self.conversation_id, prompt).await;
        in_flight.finish(outcome.map_err(|e| e.to_string()));
        Ok(())
    }

    /// `Idle | ErrorDisplayed -> Sending`: clear any error and append the
    /// user's message optimistically. The returned guard leaves `Sending`
    /// when finished or dropped.
    fn begin_send(&self, prompt: &str) -> Result<InFlight<'_, A>, SubmitError> {
        let mut inner = self.lock();
        if inner.state == SessionState::Sending {
            return Err(SubmitError::Busy);
        }
        inner.error = None;
        inner.messages.push(Message { content: prompt.to_owned(), role: Role::User });
        inner.state = SessionState::Sending;
        self.publish(&inner);
        Ok(InFlight { session: self, settled: false })
    }

    /// `Sending -> Idle` on a reply, `Sending -> ErrorDisplayed` otherwise.
    fn settle(&self, outcome: Result<String, String>) {
        let mut inner = self.lock();
        match outcome {
            Ok(reply) => {
                inner.messages.push(Message { content: reply, role: Role::Assistant });
                inner.state = SessionState::Idle;
            }
            Err(cause) => {
                inner.error = Some(FAILURE_MESSAGE.to_owned());
                inner.last_failure = Some(cause);
                inner.state = SessionState::ErrorDisplayed;
            }
        }
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        self.view_tx.send_replace(inner.view());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a request in flight. Dropping it unsettled (the submit future was
/// cancelled) counts as a failed turn so the session never sticks in
/// `Sending`.
struct InFlight<'a, A: ChatApi> {
    session: &'a ChatSession<A>,
    settled: bool,
}

impl<A: ChatApi> InFlight<'_, A> {
    fn finish(mut self, outcome: Result<String, String>) {
        self.settled = true;
        self.session.settle(outcome);
    }
}

impl<A: ChatApi> Drop for InFlight<'_, A> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.settle(Err("request cancelled".to_owned()));
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

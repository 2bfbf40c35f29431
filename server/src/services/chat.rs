//! Chat service: one conversational turn against the upstream model.
//!
//! DESIGN
//! ======
//! A turn is: look up the conversation's continuation token, call the
//! model with the prompt chained onto that token, then record the new
//! token. The token is written only after the provider confirms success,
//! so a failed turn never leaks into the context of the next one.
//!
//! The service knows nothing about HTTP. Routes decide status codes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::types::LlmError;
use crate::store::{ConversationStore, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::Llm(_) => "E_LLM_ERROR",
            Self::Store(_) => "E_STORE_ERROR",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::LlmNotConfigured => false,
            Self::Llm(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
        }
    }
}

/// The reply for one turn. Provider details stop here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub message: String,
}

// =============================================================================
// SERVICE
// =============================================================================

/// Completion service. Built once at startup with its collaborators
/// injected; cheap to clone.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    /// `None` when no provider is configured; every turn then fails.
    llm: Option<Arc<dyn LlmChat>>,
}

impl ChatService {
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { store, llm }
    }

    /// Run one turn of `conversation_id` with `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] if no provider is configured, the provider call
    /// fails, or the store fails. On any error the stored token is unchanged.
    pub async fn send_message(&self, conversation_id: Uuid, prompt: &str) -> Result<ChatReply, ChatError> {
        let llm = self.llm.as_ref().ok_or(ChatError::LlmNotConfigured)?;

        let previous = self.store.get(conversation_id).await?;
        info!(
            %conversation_id,
            prompt_len = prompt.len(),
            continued = previous.is_some(),
            "chat: prompt received"
        );

        let response = match llm.respond(prompt, previous.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%conversation_id, error = %e, code = e.error_code(), "chat: provider call failed");
                return Err(e.into());
            }
        };

        self.store
            .set(conversation_id, response.id.clone())
            .await?;
        debug!(%conversation_id, response_id = %response.id, "chat: continuation stored");
        info!(
            %conversation_id,
            model = %response.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            reply_len = response.text.len(),
            "chat: reply generated"
        );

        Ok(ChatReply { message: response.text })
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

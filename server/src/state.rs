//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the chat service, which in turn owns handles to the
//! conversation store and the LLM client built in `main`.

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::services::chat::ChatService;
use crate::store::ConversationStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { chat: ChatService::new(store, llm) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

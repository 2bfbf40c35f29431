//! LLM: upstream model provider adapter.
//!
//! DESIGN
//! ======
//! The rest of the server only sees [`LlmChat`]: a prompt and an optional
//! continuation token go in, a reply text and a new token come out. The
//! provider's wire shapes stay inside `openai.rs`, so swapping providers
//! touches nothing outside this module.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use types::LlmChat;
use types::{ChatResponse, LlmError};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete LLM client bound to one model.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
    max_output_tokens: Option<u32>,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// - `LLM_API_KEY_ENV`: name of env var holding the API key (default `OPENAI_API_KEY`)
    /// - `LLM_MODEL`: model name (default `gpt-5-nano`)
    /// - `LLM_OPENAI_BASE_URL`: custom base URL for OpenAI-compatible APIs
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(config.api_key, config.openai_base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model, max_output_tokens: config.max_output_tokens })
    }

    /// Return the configured model name (e.g. `"gpt-5-nano"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn respond(&self, prompt: &str, previous_response_id: Option<&str>) -> Result<ChatResponse, LlmError> {
        self.inner
            .respond(&self.model, self.max_output_tokens, prompt, previous_response_id)
            .await
    }
}

//! Provider-neutral reply type, the `LlmChat` seam, and its errors.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// `var` is the name of the variable that should hold the key.
    #[error("no provider key: {var} is unset or blank")]
    MissingApiKey { var: String },

    /// Transport-level failure: connect, timeout, or body read.
    #[error("provider request failed: {0}")]
    ApiRequest(String),

    /// Non-200 from the provider. `body` is kept for logs but left out of
    /// `Display` so it cannot leak into anything user-facing.
    #[error("provider returned status {status}")]
    ApiResponse { status: u16, body: String },

    #[error("provider reply unreadable: {0}")]
    ApiParse(String),

    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Transport failures, rate limits and provider 5xx may succeed on a
    /// later attempt; everything else needs a config or code change.
    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

/// One completed turn as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Continuation token for the next turn. Opaque.
    pub id: String,
    /// Reply text; every output text part, concatenated in order.
    pub text: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The upstream model as the rest of the server sees it.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// Answer `prompt`, continuing from `previous_response_id` when given.
    ///
    /// # Errors
    ///
    /// Any transport, status, or decoding failure as an [`LlmError`].
    async fn respond(&self, prompt: &str, previous_response_id: Option<&str>) -> Result<ChatResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

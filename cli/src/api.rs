//! HTTP client for the chat API.
//!
//! ERROR HANDLING
//! ==============
//! Every failure (transport, non-2xx status, undecodable body) surfaces as
//! an [`ApiError`]. The session layer collapses all of them into one
//! user-facing message, so the variants exist for logs and tests only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Seam between the session state machine and the network.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one prompt for `conversation_id` and return the assistant's reply.
    async fn send(&self, conversation_id: Uuid, prompt: &str) -> Result<String, ApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody<'a> {
    prompt: &'a str,
    conversation_id: Uuid,
}

#[derive(Deserialize)]
struct ChatReplyBody {
    message: String,
}

pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatApi {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /healthz`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the server is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let response = self.client.get(self.endpoint("/healthz")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: response.text().await.unwrap_or_default() });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatApi for HttpChatApi {
    async fn send(&self, conversation_id: Uuid, prompt: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&ChatRequestBody { prompt, conversation_id })
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        let reply: ChatReplyBody = serde_json::from_str(&text)?;
        Ok(reply.message)
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

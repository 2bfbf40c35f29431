//! Chat routes: `POST /api/chat` request validation and response mapping.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures answer 400 with a per-field error tree:
//! `{"_errors": [...], "prompt": {"_errors": [...]}, "conversationId": {"_errors": [...]}}`,
//! listing only the fields that failed. Service failures are logged with
//! their error code and answer a fixed 500 body, so upstream details never
//! reach the caller.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::state::AppState;

/// Longest accepted prompt, in characters, after trimming.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// The only failure text a caller ever sees.
pub const GENERIC_FAILURE: &str = "Failed to generate a response";

const FIELD_PROMPT: &str = "prompt";
const FIELD_CONVERSATION_ID: &str = "conversationId";

// =============================================================================
// TYPES
// =============================================================================

/// A validated chat request. `prompt` is already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub conversation_id: Uuid,
}

#[derive(Serialize)]
pub struct ChatReplyBody {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Every problem found in one request body, grouped by field.
#[derive(Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("invalid chat request")]
pub struct ValidationError {
    /// Problems with the body as a whole (not JSON, not an object).
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationError {
    fn form(message: &str) -> Self {
        Self { form_errors: vec![message.to_string()], field_errors: BTreeMap::new() }
    }

    fn push(&mut self, field: &'static str, message: &str) {
        self.field_errors
            .entry(field)
            .or_default()
            .push(message.to_string());
    }

    /// Render the wire-format error tree.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut root = Map::new();
        root.insert("_errors".into(), json!(self.form_errors));
        for (field, messages) in &self.field_errors {
            root.insert((*field).to_string(), json!({ "_errors": messages }));
        }
        Value::Object(root)
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a raw JSON body into a [`ChatRequest`], collecting every field
/// failure rather than stopping at the first.
///
/// # Errors
///
/// Returns [`ValidationError`] listing each failing field.
pub fn validate(body: &Value) -> Result<ChatRequest, ValidationError> {
    let Some(object) = body.as_object() else {
        return Err(ValidationError::form("Expected object"));
    };

    let mut errors = ValidationError::default();
    let prompt = validate_prompt(object.get(FIELD_PROMPT)).map_err(|msg| errors.push(FIELD_PROMPT, msg));
    let conversation_id = validate_conversation_id(object.get(FIELD_CONVERSATION_ID))
        .map_err(|msg| errors.push(FIELD_CONVERSATION_ID, msg));

    match (prompt, conversation_id) {
        (Ok(prompt), Ok(conversation_id)) => Ok(ChatRequest { prompt, conversation_id }),
        _ => Err(errors),
    }
}

fn validate_prompt(value: Option<&Value>) -> Result<String, &'static str> {
    let raw = match value {
        None | Some(Value::Null) => return Err("Required"),
        Some(Value::String(s)) => s,
        Some(_) => return Err("Expected string"),
    };
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err("Prompt is required");
    }
    if len > MAX_PROMPT_CHARS {
        return Err("Prompt is too long");
    }
    Ok(trimmed.to_string())
}

fn validate_conversation_id(value: Option<&Value>) -> Result<Uuid, &'static str> {
    let raw = match value {
        None | Some(Value::Null) => return Err("Required"),
        Some(Value::String(s)) => s,
        Some(_) => return Err("Expected string"),
    };
    // Only the canonical hyphenated form; `Uuid::parse_str` also takes
    // simple, braced, and urn forms.
    if raw.len() != 36 {
        return Err("Invalid uuid");
    }
    Uuid::parse_str(raw).map_err(|_| "Invalid uuid")
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/chat`: run one conversational turn.
pub async fn send_message(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    let parsed = body
        .map_err(|rejection| {
            debug!(error = %rejection, "chat: body rejected");
            ValidationError::form("Invalid JSON body")
        })
        .and_then(|Json(value)| validate(&value));
    let request = match parsed {
        Ok(request) => request,
        Err(errors) => {
            debug!(fields = ?errors.field_errors.keys().collect::<Vec<_>>(), "chat: validation failed");
            return (StatusCode::BAD_REQUEST, Json(errors.to_body())).into_response();
        }
    };

    match state
        .chat
        .send_message(request.conversation_id, &request.prompt)
        .await
    {
        Ok(reply) => Json(ChatReplyBody { message: reply.message }).into_response(),
        Err(e) => {
            error!(
                conversation_id = %request.conversation_id,
                error = %e,
                code = e.error_code(),
                retryable = e.retryable(),
                "chat: request failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: GENERIC_FAILURE })).into_response()
        }
    }
}

/// `GET /api/hello`: connectivity probe for the web client.
pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

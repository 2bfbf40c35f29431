use super::*;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use std::sync::{Arc, Mutex};

// ===== response parsing =====

#[test]
fn resp_parse_text_response() {
    let json = serde_json::json!({
        "id": "resp_1",
        "model": "gpt-5-nano",
        "output": [{
            "type": "message",
            "content": [{ "type": "output_text", "text": "Done!" }]
        }],
        "usage": { "input_tokens": 15, "output_tokens": 8 }
    })
    .to_string();
    let resp = parse_responses_response(&json).unwrap();
    assert_eq!(resp.id, "resp_1");
    assert_eq!(resp.text, "Done!");
    assert_eq!(resp.model, "gpt-5-nano");
    assert_eq!(resp.input_tokens, 15);
    assert_eq!(resp.output_tokens, 8);
}

#[test]
fn resp_parse_skips_reasoning_items_and_joins_parts() {
    let json = serde_json::json!({
        "id": "resp_2",
        "output": [
            { "type": "reasoning", "summary": [] },
            {
                "type": "message",
                "content": [
                    { "type": "output_text", "text": "Hello, " },
                    { "type": "output_text", "text": "world" }
                ]
            }
        ]
    })
    .to_string();
    let resp = parse_responses_response(&json).unwrap();
    assert_eq!(resp.text, "Hello, world");
    assert_eq!(resp.input_tokens, 0);
}

#[test]
fn resp_parse_output_text_fallback() {
    let json = serde_json::json!({
        "id": "resp_3",
        "model": "gpt-5-nano",
        "output_text": "Fallback text"
    })
    .to_string();
    let resp = parse_responses_response(&json).unwrap();
    assert_eq!(resp.text, "Fallback text");
}

#[test]
fn resp_parse_missing_id_errors() {
    let json = serde_json::json!({ "output_text": "orphan" }).to_string();
    assert!(matches!(parse_responses_response(&json), Err(LlmError::ApiParse(_))));
}

#[test]
fn resp_parse_invalid_json_errors() {
    assert!(matches!(parse_responses_response("not json"), Err(LlmError::ApiParse(_))));
}

#[test]
fn request_omits_absent_optionals() {
    let body = RespRequest {
        model: "gpt-5-nano",
        input: "hello",
        previous_response_id: None,
        max_output_tokens: None,
        store: true,
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "model": "gpt-5-nano", "input": "hello", "store": true }));
}

#[test]
fn request_carries_previous_response_id() {
    let body = RespRequest {
        model: "gpt-5-nano",
        input: "and then?",
        previous_response_id: Some("r1"),
        max_output_tokens: Some(100),
        store: true,
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["previous_response_id"], "r1");
    assert_eq!(json["max_output_tokens"], 100);
}

// ===== wire exchange against a local fake provider =====

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

async fn fake_responses(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    captured.requests.lock().unwrap().push((auth, body.clone()));
    if body["input"] == "fail" {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "error": { "message": "overloaded" } })));
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": "resp_fake",
            "model": body["model"],
            "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "pong" }] }]
        })),
    )
}

async fn spawn_fake_provider() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/responses", post(fake_responses))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/"), captured)
}

fn timeouts() -> LlmTimeouts {
    LlmTimeouts { request_secs: 5, connect_secs: 5 }
}

#[tokio::test]
async fn respond_posts_prompt_with_bearer_and_previous_id() {
    let (base_url, captured) = spawn_fake_provider().await;
    let client = OpenAiClient::new("sk-test".into(), base_url, timeouts()).unwrap();

    let resp = client
        .respond("gpt-5-nano", None, "ping", Some("resp_prev"))
        .await
        .unwrap();
    assert_eq!(resp.id, "resp_fake");
    assert_eq!(resp.text, "pong");

    let requests = captured.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-5-nano");
    assert_eq!(body["input"], "ping");
    assert_eq!(body["previous_response_id"], "resp_prev");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn respond_maps_non_200_to_api_response() {
    let (base_url, _captured) = spawn_fake_provider().await;
    let client = OpenAiClient::new("sk-test".into(), base_url, timeouts()).unwrap();

    let err = client.respond("gpt-5-nano", None, "fail", None).await.unwrap_err();
    assert!(matches!(err, LlmError::ApiResponse { status: 503, .. }));
}

#[tokio::test]
async fn respond_maps_connection_failure_to_api_request() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = OpenAiClient::new("sk-test".into(), format!("http://{addr}"), timeouts()).unwrap();

    let err = client.respond("gpt-5-nano", None, "ping", None).await.unwrap_err();
    assert!(matches!(err, LlmError::ApiRequest(_)));
}

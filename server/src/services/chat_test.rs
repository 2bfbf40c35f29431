use super::*;
use crate::llm::types::ChatResponse;
use crate::store::MemoryConversationStore;
use std::sync::Mutex;

// =========================================================================
// MockLlm
// =========================================================================

/// Scripted provider: pops one outcome per call and records what it was
/// asked, including the continuation token.
struct MockLlm {
    outcomes: Mutex<Vec<Result<ChatResponse, LlmError>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl MockLlm {
    fn new(outcomes: Vec<Result<ChatResponse, LlmError>>) -> Self {
        Self { outcomes: Mutex::new(outcomes), calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn respond(&self, prompt: &str, previous_response_id: Option<&str>) -> Result<ChatResponse, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_owned(), previous_response_id.map(str::to_owned)));
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Ok(reply("resp_default", "done"))
        } else {
            outcomes.remove(0)
        }
    }
}

fn reply(id: &str, text: &str) -> ChatResponse {
    ChatResponse { id: id.into(), text: text.into(), model: "mock".into(), input_tokens: 0, output_tokens: 0 }
}

/// Store whose backend is always down.
struct BrokenStore;

#[async_trait::async_trait]
impl ConversationStore for BrokenStore {
    async fn get(&self, _conversation_id: Uuid) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend("unreachable".into()))
    }

    async fn set(&self, _conversation_id: Uuid, _response_id: String) -> Result<(), StoreError> {
        Err(StoreError::Backend("unreachable".into()))
    }
}

fn service(store: &MemoryConversationStore, llm: &Arc<MockLlm>) -> ChatService {
    ChatService::new(Arc::new(store.clone()), Some(llm.clone()))
}

fn conversation() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

// =========================================================================
// continuation threading
// =========================================================================

#[tokio::test]
async fn first_turn_sends_no_token_and_stores_new_one() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![Ok(reply("r1", "hi there"))]));

    let out = service(&store, &llm)
        .send_message(conversation(), "hello")
        .await
        .unwrap();

    assert_eq!(out, ChatReply { message: "hi there".into() });
    assert_eq!(llm.calls(), vec![("hello".to_string(), None)]);
    assert_eq!(store.get(conversation()).await.unwrap().as_deref(), Some("r1"));
}

#[tokio::test]
async fn second_turn_chains_onto_previous_token() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![Ok(reply("r1", "hi there")), Ok(reply("r2", "then this"))]));
    let svc = service(&store, &llm);

    svc.send_message(conversation(), "hello").await.unwrap();
    let out = svc
        .send_message(conversation(), "and then?")
        .await
        .unwrap();

    assert_eq!(out.message, "then this");
    assert_eq!(llm.calls()[1], ("and then?".to_string(), Some("r1".to_string())));
    assert_eq!(store.get(conversation()).await.unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn conversations_keep_separate_tokens() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![Ok(reply("a1", "a")), Ok(reply("b1", "b")), Ok(reply("a2", "a again"))]));
    let svc = service(&store, &llm);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    svc.send_message(a, "one").await.unwrap();
    svc.send_message(b, "two").await.unwrap();
    svc.send_message(a, "three").await.unwrap();

    let calls = llm.calls();
    assert_eq!(calls[1].1, None);
    assert_eq!(calls[2].1.as_deref(), Some("a1"));
    assert_eq!(store.get(a).await.unwrap().as_deref(), Some("a2"));
    assert_eq!(store.get(b).await.unwrap().as_deref(), Some("b1"));
}

#[tokio::test]
async fn empty_reply_text_is_still_a_success() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![Ok(reply("r1", ""))]));

    let out = service(&store, &llm)
        .send_message(conversation(), "say nothing")
        .await
        .unwrap();

    assert_eq!(out.message, "");
    assert_eq!(store.get(conversation()).await.unwrap().as_deref(), Some("r1"));
}

// =========================================================================
// failures
// =========================================================================

#[tokio::test]
async fn provider_failure_leaves_store_unchanged() {
    let store = MemoryConversationStore::default();
    store.set(conversation(), "r1".into()).await.unwrap();
    let llm = Arc::new(MockLlm::new(vec![Err(LlmError::ApiResponse { status: 500, body: "boom".into() })]));

    let err = service(&store, &llm)
        .send_message(conversation(), "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Llm(LlmError::ApiResponse { status: 500, .. })));
    assert!(err.retryable());
    assert_eq!(store.get(conversation()).await.unwrap().as_deref(), Some("r1"));
}

#[tokio::test]
async fn provider_failure_on_first_turn_creates_no_entry() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![Err(LlmError::ApiRequest("timeout".into()))]));

    service(&store, &llm)
        .send_message(conversation(), "hello")
        .await
        .unwrap_err();

    assert!(store.is_empty());
}

#[tokio::test]
async fn retry_after_failure_reuses_last_good_token() {
    let store = MemoryConversationStore::default();
    let llm = Arc::new(MockLlm::new(vec![
        Ok(reply("r1", "first")),
        Err(LlmError::ApiRequest("reset".into())),
        Ok(reply("r2", "second")),
    ]));
    let svc = service(&store, &llm);

    svc.send_message(conversation(), "one").await.unwrap();
    svc.send_message(conversation(), "two").await.unwrap_err();
    svc.send_message(conversation(), "two").await.unwrap();

    let calls = llm.calls();
    assert_eq!(calls[1].1.as_deref(), Some("r1"));
    assert_eq!(calls[2].1.as_deref(), Some("r1"));
    assert_eq!(store.get(conversation()).await.unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn missing_provider_is_not_configured_error() {
    let store = MemoryConversationStore::default();
    let svc = ChatService::new(Arc::new(store.clone()), None);

    let err = svc
        .send_message(conversation(), "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::LlmNotConfigured));
    assert_eq!(err.error_code(), "E_LLM_NOT_CONFIGURED");
    assert!(!err.retryable());
}

#[tokio::test]
async fn store_failure_skips_provider_call() {
    let llm = Arc::new(MockLlm::new(vec![]));
    let svc = ChatService::new(Arc::new(BrokenStore), Some(llm.clone()));

    let err = svc
        .send_message(conversation(), "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Store(_)));
    assert_eq!(err.error_code(), "E_STORE_ERROR");
    assert!(llm.calls().is_empty());
}

//! OpenAI-compatible provider contract tests.
//!
//! Verify the request format sent to `/v1/chat/completions`, response
//! parsing, and error mapping against a mock server.

use rekindle::config::EndpointConfig;
use rekindle::host::{CompletionProvider, HistoryTurn, ProviderRegistry};
use rekindle::providers::{OpenAiCompatProvider, StaticProviderRegistry};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn provider(server: &MockServer, key: Option<&str>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(
        "mock",
        server.uri(),
        "test-model",
        key.map(str::to_owned),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn sends_model_prompt_and_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": false,
            "messages": [{"role": "user", "content": "what happened today?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("I found a coin")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider(&server, Some("sk-test"))
        .text_chat("what happened today?", None)
        .await
        .unwrap();
    assert_eq!(reply, "I found a coin");
}

#[tokio::test]
async fn context_turns_are_sent_before_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello!"},
                {"role": "user", "content": "continue"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let context = vec![HistoryTurn::user("hi"), HistoryTurn::assistant("hello!")];
    let reply = provider(&server, None)
        .text_chat("continue", Some(&context))
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn missing_content_is_an_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let reply = provider(&server, None).text_chat("x", None).await.unwrap();
    assert_eq!(reply, "");
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server, Some("bad")).text_chat("x", None).await.unwrap_err();
    assert_eq!(err.to_string(), "authentication failed: Incorrect API key provided");
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = provider(&server, None).text_chat("x", None).await.unwrap_err();
    assert!(err.to_string().starts_with("rate limited"));
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = provider(&server, None).text_chat("x", None).await.unwrap_err();
    assert!(err.to_string().contains("malformed completion response"));
}

#[tokio::test]
async fn registry_providers_reach_their_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "small-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("from registry")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = StaticProviderRegistry::from_endpoints(&[EndpointConfig {
        id: "local".to_owned(),
        base_url: server.uri(),
        model: "small-model".to_owned(),
        ..EndpointConfig::default()
    }]);
    let provider = registry.provider("local").unwrap();
    assert_eq!(provider.id(), "local");
    assert_eq!(provider.text_chat("hi", None).await.unwrap(), "from registry");
}

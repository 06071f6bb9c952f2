//! Config file through provider registry to a generated message.

use crate::helpers::RecordingSink;
use rekindle::config::{ConfigHandle, RekindleConfig};
use rekindle::host::MemoryConversationStore;
use rekindle::providers::StaticProviderRegistry;
use rekindle::{InboundEvent, ProactiveScheduler, SessionKey};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn toml_config_drives_both_phases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("topic-model"))
        .respond_with(reply("I planted tomatoes"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("chat-model"))
        .and(body_string_contains("EVENT=I planted tomatoes"))
        .respond_with(reply("Want to see my tomato plants?"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let toml = format!(
        r#"
[providers]
huati_provider_id = "topic"
chat_provider_id = "chat"

[prompts]
huati_prompt = "what happened today?"
chat_prompt = "EVENT={{todays_event}} HOURS={{inactive_hours}} HISTORY={{history_text}}"

[[endpoints]]
id = "topic"
base_url = "{uri}"
model = "topic-model"

[[endpoints]]
id = "chat"
base_url = "{uri}"
model = "chat-model"
"#,
        uri = server.uri()
    );
    std::fs::write(&path, toml).unwrap();

    let config = RekindleConfig::from_file(&path).unwrap();
    assert!(config.validate().is_empty());

    let registry = StaticProviderRegistry::from_endpoints(&config.endpoints);
    let scheduler = ProactiveScheduler::builder(
        ConfigHandle::new(config),
        Arc::new(registry),
        Arc::new(MemoryConversationStore::default()),
        Arc::new(RecordingSink::default()),
    )
    .build();

    let event = InboundEvent {
        sender_id: "owner".to_owned(),
        session: SessionKey::new("webchat:owner"),
        platform: "webchat".to_owned(),
        is_admin: true,
        text: "/rekindle_talk".to_owned(),
    };
    let reply = scheduler.manual_trigger(&event).await;
    assert_eq!(reply.last(), Some("Want to see my tomato plants?"));
}

#[test]
fn unparseable_config_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[rules\ninactive_hours = 3").unwrap();

    let err = RekindleConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, rekindle::RekindleError::Config(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RekindleConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, rekindle::RekindleError::Io(_)));
}

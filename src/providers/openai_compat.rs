//! OpenAI-compatible Chat Completions provider.
//!
//! Non-streaming: one `POST {base_url}/v1/chat/completions` per call, reading
//! `choices[0].message.content` from the response. Works with any server that
//! speaks the same wire format.

use crate::config::EndpointConfig;
use crate::host::{CompletionProvider, HistoryTurn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion provider backed by a Chat Completions endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Build a provider with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            id: id.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Build a provider from an `[[endpoints]]` entry, reading the key from
    /// the configured environment variable if one is named.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_endpoint(endpoint: &EndpointConfig) -> anyhow::Result<Self> {
        let api_key = endpoint
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        Self::new(
            endpoint.id.clone(),
            endpoint.base_url.clone(),
            endpoint.model.clone(),
            api_key,
            Duration::from_secs(endpoint.timeout_secs.max(1)),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_messages<'a>(prompt: &'a str, context: Option<&'a [HistoryTurn]>) -> Vec<ChatMessage<'a>> {
    let mut messages: Vec<ChatMessage<'a>> = context
        .unwrap_or_default()
        .iter()
        .map(|turn| ChatMessage {
            role: if turn.role == "user" { "user" } else { "assistant" },
            content: &turn.content,
        })
        .collect();
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });
    messages
}

/// Map an HTTP error status to a descriptive error.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => anyhow::anyhow!("authentication failed: {message}"),
        429 => anyhow::anyhow!("rate limited: {message}"),
        code => anyhow::anyhow!("HTTP {code}: {message}"),
    }
}

/// Extract `error.message` from an error body, or return the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn text_chat(
        &self,
        prompt: &str,
        context: Option<&[HistoryTurn]>,
    ) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(prompt, context),
            stream: false,
        };

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("malformed completion response: {e}"))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

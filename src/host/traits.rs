//! Collaborator traits the scheduler core talks through.

use crate::session::SessionKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One turn of stored conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: content.into(),
        }
    }
}

/// A stored conversation as handed out by the host store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    /// Serialized JSON list of `{role, content}` turns, oldest first.
    pub history: String,
}

/// Outbound message body. Plain text segments, sent in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageChain {
    pub segments: Vec<String>,
}

impl MessageChain {
    /// Chain with a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
        }
    }

    /// Concatenated plain text of every segment.
    pub fn plain_text(&self) -> String {
        self.segments.concat()
    }
}

/// Language-model provider. New backends only need to implement this trait.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stable provider identifier referenced from config.
    fn id(&self) -> &str;

    /// Single-shot text completion. `context` turns precede the prompt.
    async fn text_chat(&self, prompt: &str, context: Option<&[HistoryTurn]>)
    -> anyhow::Result<String>;
}

/// Resolves provider ids to providers.
pub trait ProviderRegistry: Send + Sync {
    fn provider(&self, id: &str) -> Option<Arc<dyn CompletionProvider>>;
}

/// Conversation-history store owned by the host.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Id of the session's active conversation, if it has one.
    async fn current_conversation_id(&self, session: &SessionKey) -> anyhow::Result<Option<String>>;

    /// Load a conversation by id.
    async fn conversation(
        &self,
        session: &SessionKey,
        conversation_id: &str,
    ) -> anyhow::Result<Option<Conversation>>;
}

/// Outbound delivery to a session.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_message(&self, session: &SessionKey, chain: MessageChain) -> anyhow::Result<()>;
}

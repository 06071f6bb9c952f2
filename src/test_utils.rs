//! Shared test doubles for the host collaborator traits.
//!
//! Used by the unit tests in `pipeline` and `scheduler`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::host::{
    CompletionProvider, Conversation, ConversationStore, HistoryTurn, MessageChain, MessageSink,
    ProviderRegistry,
};
use crate::session::SessionKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider that answers from a fixed script and records every prompt.
pub struct ScriptedProvider {
    id: String,
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Always answer `reply`.
    pub fn replying(id: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            reply: Ok(reply.to_owned()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Always fail with `message`.
    pub fn failing(id: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            reply: Err(message.to_owned()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answer `reply` after sleeping `delay` on the tokio timer.
    pub fn delayed(id: &str, reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            reply: Ok(reply.to_owned()),
            delay: Some(delay),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn text_chat(
        &self,
        prompt: &str,
        _context: Option<&[HistoryTurn]>,
    ) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(prompt.to_owned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(|m| anyhow::anyhow!(m))
    }
}

/// Registry over a fixed set of providers.
#[derive(Default)]
pub struct FakeRegistry {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
}

impl FakeRegistry {
    pub fn with(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.insert(provider.id().to_owned(), provider);
        self
    }
}

impl ProviderRegistry for FakeRegistry {
    fn provider(&self, id: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(id).cloned()
    }
}

/// Store whose every read fails.
pub struct FailingStore;

#[async_trait]
impl ConversationStore for FailingStore {
    async fn current_conversation_id(&self, _session: &SessionKey) -> anyhow::Result<Option<String>> {
        anyhow::bail!("store offline")
    }

    async fn conversation(
        &self,
        _session: &SessionKey,
        _conversation_id: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        anyhow::bail!("store offline")
    }
}

/// Sink that records deliveries, optionally failing them.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(SessionKey, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(SessionKey, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(&self, session: &SessionKey, chain: MessageChain) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("platform unreachable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((session.clone(), chain.plain_text()));
        Ok(())
    }
}

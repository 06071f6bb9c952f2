//! In-memory conversation store.
//!
//! Keeps a fixed number of recent turns per session so the generation
//! pipeline has something to read when the host does not bring its own
//! store. Each session gets one conversation id on its first turn.

use crate::host::traits::{Conversation, ConversationStore, HistoryTurn};
use crate::session::SessionKey;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug)]
struct SessionConversation {
    id: String,
    turns: VecDeque<HistoryTurn>,
}

/// Conversation history with fixed per-session capacity.
#[derive(Debug)]
pub struct MemoryConversationStore {
    sessions: Mutex<HashMap<SessionKey, SessionConversation>>,
    max_turns: usize,
}

impl MemoryConversationStore {
    /// Create a store keeping at most `max_turns` turns per session.
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn, evicting the oldest if at capacity.
    pub fn append(&self, session: &SessionKey, turn: HistoryTurn) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions
            .entry(session.clone())
            .or_insert_with(|| SessionConversation {
                id: uuid::Uuid::new_v4().to_string(),
                turns: VecDeque::with_capacity(self.max_turns),
            });

        if entry.turns.len() >= self.max_turns {
            entry.turns.pop_front();
        }
        entry.turns.push_back(turn);
    }

    /// Turns recorded for a session, oldest first.
    #[must_use]
    pub fn turns(&self, session: &SessionKey) -> Vec<HistoryTurn> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session)
            .map(|c| c.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop everything recorded for a session.
    pub fn clear_session(&self, session: &SessionKey) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session);
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn current_conversation_id(&self, session: &SessionKey) -> anyhow::Result<Option<String>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("conversation store lock poisoned"))?;
        Ok(sessions.get(session).map(|c| c.id.clone()))
    }

    async fn conversation(
        &self,
        session: &SessionKey,
        conversation_id: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        let turns = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| anyhow::anyhow!("conversation store lock poisoned"))?;
            match sessions.get(session) {
                Some(c) if c.id == conversation_id => c.turns.iter().cloned().collect::<Vec<_>>(),
                _ => return Ok(None),
            }
        };

        Ok(Some(Conversation {
            id: conversation_id.to_owned(),
            history: serde_json::to_string(&turns)?,
        }))
    }
}

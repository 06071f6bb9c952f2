//! Two-phase generation pipeline.
//!
//! The topic phase asks the topic provider for a short "today I..." seed with
//! no context. The chat phase renders the chat template with that seed, the
//! configured inactivity hours and the last few turns of the session's
//! history, and sends it to the chat provider. Each phase's failure is caught
//! and logged here; callers only see a [`GenerationOutcome`].

pub mod history;
pub mod prompt;

use crate::clock::Clock;
use crate::config::{ConfigHandle, RekindleConfig};
use crate::error::{RekindleError, Result};
use crate::host::{ConversationStore, ProviderRegistry};
use crate::quiet_hours::QuietHoursPolicy;
use crate::session::SessionKey;
use prompt::ChatPromptVars;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a generation was skipped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Local time fell inside the quiet window.
    QuietHours,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Non-empty text ready for delivery.
    Produced(String),
    /// Nothing was generated, deliberately.
    Suppressed(Suppression),
    /// A phase failed; nothing was generated.
    Failed(RekindleError),
}

impl GenerationOutcome {
    /// The produced text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Produced(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Produced(text) => Some(text),
            _ => None,
        }
    }
}

/// Generates proactive messages for a session.
#[derive(Clone)]
pub struct GenerationPipeline {
    config: ConfigHandle,
    providers: Arc<dyn ProviderRegistry>,
    conversations: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
}

impl GenerationPipeline {
    pub fn new(
        config: ConfigHandle,
        providers: Arc<dyn ProviderRegistry>,
        conversations: Arc<dyn ConversationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            providers,
            conversations,
            clock,
        }
    }

    /// Run both phases for `session`.
    ///
    /// Unless `ignore_quiet_hours` is set, the quiet window is checked again
    /// against the current local time first; a dispatch deferred past the
    /// window normally passes this check, but a config change in between may
    /// not.
    pub async fn generate(&self, session: &SessionKey, ignore_quiet_hours: bool) -> GenerationOutcome {
        let config = match self.config.current() {
            Ok(config) => config,
            Err(e) => {
                error!(session = %session, error = %e, "cannot read config for generation");
                return GenerationOutcome::Failed(e);
            }
        };

        if !ignore_quiet_hours {
            let policy =
                QuietHoursPolicy::new(config.rules.sleep_start_hour, config.rules.sleep_end_hour);
            if policy.contains(self.clock.now_local()) {
                info!(session = %session, "inside quiet hours, generation suppressed");
                return GenerationOutcome::Suppressed(Suppression::QuietHours);
            }
        }

        let topic = match self.topic_phase(&config).await {
            Ok(topic) => topic,
            Err(e) => {
                error!(session = %session, error = %e, "topic phase failed");
                return GenerationOutcome::Failed(e);
            }
        };
        debug!(session = %session, topic = %topic, "topic phase produced seed");

        match self.chat_phase(session, &config, &topic).await {
            Ok(text) => GenerationOutcome::Produced(text),
            Err(e) => {
                error!(session = %session, error = %e, "chat phase failed");
                GenerationOutcome::Failed(e)
            }
        }
    }

    async fn topic_phase(&self, config: &RekindleConfig) -> Result<String> {
        let provider_id = config.providers.topic_provider().ok_or_else(|| {
            RekindleError::ConfigurationMissing("topic provider id is not set".to_owned())
        })?;
        self.call_provider(provider_id, &config.prompts.topic_prompt)
            .await
    }

    async fn chat_phase(
        &self,
        session: &SessionKey,
        config: &RekindleConfig,
        topic: &str,
    ) -> Result<String> {
        let provider_id = config.providers.chat_provider().ok_or_else(|| {
            RekindleError::ConfigurationMissing("chat provider id is not set".to_owned())
        })?;

        let history_text = self.history_text(session).await;
        let rendered = prompt::render_chat_prompt(
            &config.prompts.chat_prompt,
            &ChatPromptVars {
                inactive_hours: config.rules.inactive_hours,
                todays_event: topic,
                history_text: &history_text,
            },
        )?;

        self.call_provider(provider_id, &rendered).await
    }

    async fn call_provider(&self, provider_id: &str, prompt: &str) -> Result<String> {
        let provider = self.providers.provider(provider_id).ok_or_else(|| {
            RekindleError::ConfigurationMissing(format!("provider `{provider_id}` is not registered"))
        })?;

        let reply = provider
            .text_chat(prompt, None)
            .await
            .map_err(|e| RekindleError::ProviderCall {
                provider: provider_id.to_owned(),
                message: format!("{e:#}"),
            })?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(RekindleError::EmptyResult(provider_id.to_owned()));
        }
        Ok(reply.to_owned())
    }

    /// Formatted recent history, or the placeholder when none can be read.
    async fn history_text(&self, session: &SessionKey) -> String {
        match self.recent_history(session).await {
            Ok(Some(text)) => text,
            Ok(None) => history::NO_HISTORY_PLACEHOLDER.to_owned(),
            Err(e) => {
                warn!(session = %session, error = %e, "using placeholder history");
                history::NO_HISTORY_PLACEHOLDER.to_owned()
            }
        }
    }

    async fn recent_history(&self, session: &SessionKey) -> Result<Option<String>> {
        let fetch_err = |e: anyhow::Error| RekindleError::HistoryFetch(format!("{e:#}"));

        let Some(conversation_id) = self
            .conversations
            .current_conversation_id(session)
            .await
            .map_err(fetch_err)?
        else {
            return Ok(None);
        };
        let Some(conversation) = self
            .conversations
            .conversation(session, &conversation_id)
            .await
            .map_err(fetch_err)?
        else {
            return Ok(None);
        };

        if conversation.history.trim().is_empty() {
            return Ok(None);
        }
        let turns = history::recent_turns(&conversation.history)?;
        Ok(history::format_turns(&turns))
    }
}

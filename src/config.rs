//! Configuration types for the re-engagement scheduler.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Default topic-phase prompt.
pub const DEFAULT_TOPIC_PROMPT: &str = "You are a warm, playful companion. In a single sentence, \
describe one small, unusual thing that happened to you today. Reply with the event only, \
without any extra words.";

/// Default chat-phase prompt template.
///
/// Placeholders: `{inactive_hours}`, `{todays_event}`, `{history_text}`.
pub const DEFAULT_CHAT_PROMPT: &str = "You are a warm, playful companion. The user has not \
talked to you for about {inactive_hours} hours. Something happened to you today: \
{todays_event}\n\nYour most recent conversation was:\n{history_text}\n\nWrite one short, \
natural message that reopens the conversation. Mention what happened today and, if it fits, \
refer back to what you talked about last time.";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RekindleConfig {
    /// Whether the background scanner starts at all.
    pub enabled: bool,
    /// Sender ids tracked on every platform, not only on webchat.
    pub whitelist_users: Vec<String>,
    /// Scan timing and quiet hours.
    pub rules: RulesConfig,
    /// Provider ids for the two generation phases.
    pub providers: ProvidersConfig,
    /// Prompts for the two generation phases.
    pub prompts: PromptsConfig,
    /// HTTP endpoints available to the reference provider registry.
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for RekindleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist_users: Vec::new(),
            rules: RulesConfig::default(),
            providers: ProvidersConfig::default(),
            prompts: PromptsConfig::default(),
            endpoints: Vec::new(),
        }
    }
}

/// Scan timing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Minutes between scans.
    pub check_interval_minutes: u64,
    /// Hours of inactivity before a session is re-engaged.
    pub inactive_hours: u64,
    /// First hour (0-23) of the daily quiet window.
    pub sleep_start_hour: u32,
    /// Hour (0-23) the quiet window ends, exclusive.
    pub sleep_end_hour: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            check_interval_minutes: 60,
            inactive_hours: 24,
            sleep_start_hour: 0,
            sleep_end_hour: 10,
        }
    }
}

impl RulesConfig {
    /// Resolve the rules into concrete durations.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            check_interval: Duration::from_secs(
                self.check_interval_minutes.max(1).saturating_mul(60),
            ),
            inactive_threshold: Duration::from_secs(self.inactive_hours.saturating_mul(3600)),
            sleep_start_hour: self.sleep_start_hour,
            sleep_end_hour: self.sleep_end_hour,
        }
    }
}

/// Resolved scan parameters, immutable for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub check_interval: Duration,
    pub inactive_threshold: Duration,
    pub sleep_start_hour: u32,
    pub sleep_end_hour: u32,
}

/// Provider ids for the generation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider used for the topic phase. Required.
    #[serde(rename = "huati_provider_id", alias = "topic_provider_id")]
    pub topic_provider_id: Option<String>,
    /// Provider used for the chat phase. Falls back to the topic provider.
    pub chat_provider_id: Option<String>,
}

impl ProvidersConfig {
    /// Topic provider id, treating a blank value as unset.
    #[must_use]
    pub fn topic_provider(&self) -> Option<&str> {
        non_blank(self.topic_provider_id.as_deref())
    }

    /// Chat provider id, falling back to the topic provider.
    #[must_use]
    pub fn chat_provider(&self) -> Option<&str> {
        non_blank(self.chat_provider_id.as_deref()).or_else(|| self.topic_provider())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Prompts for the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt sent to the topic provider with no context.
    #[serde(rename = "huati_prompt", alias = "topic_prompt")]
    pub topic_prompt: String,
    /// Template rendered for the chat provider.
    pub chat_prompt: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            topic_prompt: DEFAULT_TOPIC_PROMPT.to_owned(),
            chat_prompt: DEFAULT_CHAT_PROMPT.to_owned(),
        }
    }
}

/// An OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Provider id referenced from `[providers]`.
    pub id: String,
    /// Base URL without the `/v1/...` suffix.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            base_url: "https://api.openai.com".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key_env: None,
            timeout_secs: 60,
        }
    }
}

/// Severity of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueSeverity {
    Warning,
    Error,
}

/// Validation issue found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub id: String,
    pub severity: ConfigIssueSeverity,
    pub summary: String,
}

impl RekindleConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::RekindleError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RekindleError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/rekindle/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("rekindle")
            .join("config.toml")
    }

    /// Check the configuration without touching any provider.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (key, hour) in [
            ("sleep_start_hour", self.rules.sleep_start_hour),
            ("sleep_end_hour", self.rules.sleep_end_hour),
        ] {
            if hour > 23 {
                issues.push(ConfigIssue {
                    id: format!("rules-{key}-out-of-range"),
                    severity: ConfigIssueSeverity::Error,
                    summary: format!("rules.{key} must be within 0-23, got {hour}."),
                });
            }
        }

        if self.rules.sleep_start_hour == self.rules.sleep_end_hour {
            issues.push(ConfigIssue {
                id: "rules-empty-quiet-window".to_owned(),
                severity: ConfigIssueSeverity::Warning,
                summary: "Quiet hours start and end at the same hour; no quiet window applies."
                    .to_owned(),
            });
        }

        if self.rules.inactive_hours == 0 {
            issues.push(ConfigIssue {
                id: "rules-zero-inactive-hours".to_owned(),
                severity: ConfigIssueSeverity::Warning,
                summary: "rules.inactive_hours is 0; every tracked session is re-engaged on each scan."
                    .to_owned(),
            });
        }

        if self.rules.check_interval_minutes.checked_mul(60).is_none() {
            issues.push(ConfigIssue {
                id: "rules-check-interval-out-of-range".to_owned(),
                severity: ConfigIssueSeverity::Error,
                summary: format!(
                    "rules.check_interval_minutes is too large, got {}.",
                    self.rules.check_interval_minutes
                ),
            });
        }

        let threshold_fits = self
            .rules
            .inactive_hours
            .checked_mul(3600)
            .is_some_and(|secs| chrono::Duration::from_std(Duration::from_secs(secs)).is_ok());
        if !threshold_fits {
            issues.push(ConfigIssue {
                id: "rules-inactive-hours-out-of-range".to_owned(),
                severity: ConfigIssueSeverity::Error,
                summary: format!(
                    "rules.inactive_hours is too large, got {}; scans will fail until it is lowered.",
                    self.rules.inactive_hours
                ),
            });
        }

        if self.providers.topic_provider().is_none() {
            issues.push(ConfigIssue {
                id: "providers-missing-topic-provider".to_owned(),
                severity: ConfigIssueSeverity::Error,
                summary: "providers.huati_provider_id is not set; no message can be generated."
                    .to_owned(),
            });
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.id.trim().is_empty() {
                issues.push(ConfigIssue {
                    id: format!("endpoint-missing-id-{index}"),
                    severity: ConfigIssueSeverity::Warning,
                    summary: format!(
                        "Endpoint #{index} ({}) has no id and cannot be referenced.",
                        endpoint.base_url
                    ),
                });
            }
        }

        issues
    }
}

/// Shared, replaceable view of the live configuration.
///
/// Readers take a clone per use so a reload between scanner ticks is picked
/// up on the next tick.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<RekindleConfig>>,
}

impl ConfigHandle {
    pub fn new(config: RekindleConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone of the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RekindleError::Scheduler`](crate::error::RekindleError::Scheduler)
    /// if a writer panicked while holding the lock.
    pub fn current(&self) -> crate::error::Result<RekindleConfig> {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| crate::error::RekindleError::Scheduler("config lock poisoned".to_owned()))
    }

    /// Swap in a new configuration.
    ///
    /// A full swap also clears a poisoned lock, since nothing of the old
    /// value survives.
    pub fn replace(&self, config: RekindleConfig) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = config;
        drop(guard);
        self.inner.clear_poison();
    }

    /// Apply an in-place edit to the live configuration.
    pub fn update(&self, edit: impl FnOnce(&mut RekindleConfig)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        edit(&mut guard);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(RekindleConfig::default())
    }
}

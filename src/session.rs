//! Session identity and inbound events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform tag for the built-in web chat surface.
pub const WEBCHAT_PLATFORM: &str = "webchat";

/// Opaque key of one addressable conversation (unified message origin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Inbound event delivered by the host dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender identifier on the originating platform.
    pub sender_id: String,
    /// Session the event belongs to.
    pub session: SessionKey,
    /// Platform tag (e.g. `webchat`, `discord`).
    pub platform: String,
    /// Result of the host's admin-permission check for this sender.
    #[serde(default)]
    pub is_admin: bool,
    /// Plain-text content, if any.
    #[serde(default)]
    pub text: String,
}

impl InboundEvent {
    /// Whether this event should refresh the session's activity timestamp.
    ///
    /// Webchat events always count; on other platforms only whitelisted
    /// senders do.
    #[must_use]
    pub fn counts_as_activity(&self, whitelist: &[String]) -> bool {
        self.platform == WEBCHAT_PLATFORM || whitelist.iter().any(|id| *id == self.sender_id)
    }
}

//! Per-session activity tracking.
//!
//! Maps each [`SessionKey`] to the last time it was seen active. The map is
//! shared between the inbound event path (writes), the scanner (snapshot +
//! reset) and any number of readers; every operation takes the lock for the
//! shortest possible span and never holds it across an await.

use crate::error::{RekindleError, Result};
use crate::session::SessionKey;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared last-activity map. Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    inner: Arc<Mutex<HashMap<SessionKey, DateTime<Utc>>>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the session's last-activity timestamp. Last write wins.
    pub fn record_activity(&self, session: SessionKey, at: DateTime<Utc>) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(session, at);
    }

    /// Point-in-time copy of every tracked session.
    ///
    /// # Errors
    ///
    /// Returns [`RekindleError::Scheduler`] if the map lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<(SessionKey, DateTime<Utc>)>> {
        let map = self
            .inner
            .lock()
            .map_err(|_| RekindleError::Scheduler("activity map lock poisoned".to_owned()))?;
        Ok(map.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    /// Last recorded activity for one session.
    #[must_use]
    pub fn last_active(&self, session: &SessionKey) -> Option<DateTime<Utc>> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(session).copied()
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Periodic inactivity scan.
//!
//! Each tick reads the current config, sleeps for `check_interval`, then
//! selects every tracked session idle for longer than the threshold. Selected
//! sessions get their timestamp reset to the detection time before their
//! dispatch is spawned, so a dispatch that is still deferred or generating
//! cannot cause the same session to be picked again on the next tick.

use crate::activity::ActivityTracker;
use crate::clock::Clock;
use crate::config::ConfigHandle;
use crate::error::{RekindleError, Result};
use crate::scheduler::dispatcher::SessionDispatcher;
use crate::session::SessionKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

/// Pause after a failed scan before the next attempt.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Lifecycle of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// Waiting for the next tick.
    Idle,
    /// Selecting sessions and spawning dispatches.
    Scanning,
    /// Cancelled. Terminal.
    Stopped,
}

/// Selects idle sessions and fans out dispatch tasks.
pub struct InactivityScanner {
    tracker: ActivityTracker,
    config: ConfigHandle,
    dispatcher: Arc<SessionDispatcher>,
    clock: Arc<dyn Clock>,
    dispatches: TaskTracker,
    state: watch::Sender<ScannerState>,
}

impl InactivityScanner {
    /// Dispatches are spawned on `dispatches`; they are not cancelled when
    /// the scanner stops.
    pub fn new(
        tracker: ActivityTracker,
        config: ConfigHandle,
        dispatcher: Arc<SessionDispatcher>,
        clock: Arc<dyn Clock>,
        dispatches: TaskTracker,
    ) -> Self {
        let (state, _) = watch::channel(ScannerState::Idle);
        Self {
            tracker,
            config,
            dispatcher,
            clock,
            dispatches,
            state,
        }
    }

    /// Watch the loop state.
    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ScannerState {
        *self.state.borrow()
    }

    /// Run one scan now and return the sessions selected.
    ///
    /// # Errors
    ///
    /// Returns [`RekindleError::Scheduler`] if the config or tracker cannot be
    /// read. No session is reset in that case.
    pub fn scan_once(&self) -> Result<Vec<SessionKey>> {
        let scan = self.config.current()?.rules.scan_config();
        let threshold = chrono::Duration::from_std(scan.inactive_threshold)
            .map_err(|e| RekindleError::Scheduler(format!("inactive threshold out of range: {e}")))?;
        let snapshot = self.tracker.snapshot()?;
        let now = self.clock.now_utc();

        let mut selected = Vec::new();
        for (session, last_active) in snapshot {
            let idle = now - last_active;
            if idle <= threshold {
                continue;
            }

            info!(
                session = %session,
                idle_minutes = idle.num_minutes(),
                "session inactive, scheduling re-engagement"
            );
            self.tracker.record_activity(session.clone(), now);

            let dispatcher = Arc::clone(&self.dispatcher);
            let key = session.clone();
            self.dispatches.spawn(async move {
                dispatcher.dispatch(key).await;
            });
            selected.push(session);
        }

        Ok(selected)
    }

    /// Run the scan loop until `cancel` fires.
    ///
    /// Cancellation is observed while sleeping, and a scan in progress always
    /// finishes first.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("inactivity scanner started");

        loop {
            self.state.send_replace(ScannerState::Idle);

            let wait = match self.config.current() {
                Ok(config) => config.rules.scan_config().check_interval,
                Err(e) => {
                    error!(error = %e, "cannot read scan interval, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                    }
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            self.state.send_replace(ScannerState::Scanning);
            debug!("scanning for inactive sessions");

            match self.scan_once() {
                Ok(selected) => {
                    debug!(selected = selected.len(), "scan complete");
                }
                Err(e) => {
                    error!(error = %e, "scan failed, backing off");
                    self.state.send_replace(ScannerState::Idle);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        self.state.send_replace(ScannerState::Stopped);
        info!("inactivity scanner stopped");
    }
}

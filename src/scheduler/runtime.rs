//! Scheduler assembly and lifecycle.
//!
//! [`ProactiveScheduler`] owns every piece of scheduler state: the activity
//! tracker, the live config handle, the pipeline, the scanner and the task
//! tracker holding in-flight dispatches. [`ProactiveScheduler::start`] spawns
//! the scan loop and hands back the only stop signal in a [`SchedulerHandle`].

use crate::activity::ActivityTracker;
use crate::clock::{Clock, SystemClock};
use crate::commands::{CommandReply, NOTHING_TO_SAY_REPLY};
use crate::config::ConfigHandle;
use crate::error::{RekindleError, Result};
use crate::host::{ConversationStore, MessageSink, ProviderRegistry};
use crate::pipeline::{GenerationOutcome, GenerationPipeline};
use crate::quiet_hours::{JitterSource, RandomJitter};
use crate::scheduler::dispatcher::SessionDispatcher;
use crate::scheduler::scanner::{InactivityScanner, ScannerState};
use crate::session::{InboundEvent, SessionKey};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Collects collaborators for a [`ProactiveScheduler`].
pub struct ProactiveSchedulerBuilder {
    config: ConfigHandle,
    providers: Arc<dyn ProviderRegistry>,
    conversations: Arc<dyn ConversationStore>,
    sink: Arc<dyn MessageSink>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
}

impl ProactiveSchedulerBuilder {
    /// Override the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the jitter draw. Defaults to [`RandomJitter`].
    pub fn jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn build(self) -> ProactiveScheduler {
        let tracker = ActivityTracker::new();
        let dispatches = TaskTracker::new();
        let pipeline = GenerationPipeline::new(
            self.config.clone(),
            self.providers,
            self.conversations,
            Arc::clone(&self.clock),
        );
        let dispatcher = Arc::new(SessionDispatcher::new(
            self.config.clone(),
            pipeline.clone(),
            self.sink,
            Arc::clone(&self.clock),
            self.jitter,
        ));
        let scanner = Arc::new(InactivityScanner::new(
            tracker.clone(),
            self.config.clone(),
            dispatcher,
            Arc::clone(&self.clock),
            dispatches.clone(),
        ));

        ProactiveScheduler {
            config: self.config,
            tracker,
            pipeline,
            scanner,
            dispatches,
            clock: self.clock,
        }
    }
}

/// The re-engagement scheduler.
pub struct ProactiveScheduler {
    config: ConfigHandle,
    tracker: ActivityTracker,
    pipeline: GenerationPipeline,
    scanner: Arc<InactivityScanner>,
    dispatches: TaskTracker,
    clock: Arc<dyn Clock>,
}

impl ProactiveScheduler {
    pub fn builder(
        config: ConfigHandle,
        providers: Arc<dyn ProviderRegistry>,
        conversations: Arc<dyn ConversationStore>,
        sink: Arc<dyn MessageSink>,
    ) -> ProactiveSchedulerBuilder {
        ProactiveSchedulerBuilder {
            config,
            providers,
            conversations,
            sink,
            clock: Arc::new(SystemClock),
            jitter: Arc::new(RandomJitter),
        }
    }

    /// Record an inbound event as activity if it qualifies.
    ///
    /// Returns whether the tracker was updated.
    pub fn observe(&self, event: &InboundEvent) -> bool {
        let whitelist = match self.config.current() {
            Ok(config) => config.whitelist_users,
            Err(e) => {
                warn!(error = %e, "cannot read whitelist, ignoring event");
                return false;
            }
        };
        if !event.counts_as_activity(&whitelist) {
            return false;
        }
        self.tracker
            .record_activity(event.session.clone(), self.clock.now_utc());
        true
    }

    /// Spawn the scan loop. Returns `None` when the scheduler is disabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<SchedulerHandle> {
        match self.config.current() {
            Ok(config) if !config.enabled => {
                info!("proactive scheduler disabled in config");
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "cannot read config, scheduler not started");
                return None;
            }
        }

        let cancel = CancellationToken::new();
        let state = self.scanner.subscribe();
        let scanner = Arc::clone(&self.scanner);
        let token = cancel.clone();
        let join = tokio::spawn(async move { scanner.run(token).await });

        Some(SchedulerHandle {
            cancel,
            state,
            join: Some(join),
        })
    }

    /// Run a single scan immediately, outside the loop.
    ///
    /// # Errors
    ///
    /// Returns [`RekindleError::Scheduler`] on a transient read failure.
    pub fn scan_now(&self) -> Result<Vec<SessionKey>> {
        self.scanner.scan_once()
    }

    /// Handle the manual trigger command for `event`'s sender.
    ///
    /// Bypasses both the idle threshold and quiet hours. Non-admins are
    /// refused without touching the pipeline.
    pub async fn manual_trigger(&self, event: &InboundEvent) -> CommandReply {
        if !event.is_admin {
            warn!(sender = %event.sender_id, "manual trigger refused for non-admin");
            return CommandReply::denied();
        }

        info!(session = %event.session, sender = %event.sender_id, "manual trigger");
        let mut reply = CommandReply::acknowledged();
        match self.pipeline.generate(&event.session, true).await {
            GenerationOutcome::Produced(text) => reply.push(text),
            GenerationOutcome::Suppressed(_)
            | GenerationOutcome::Failed(RekindleError::EmptyResult(_)) => {
                reply.push(NOTHING_TO_SAY_REPLY);
            }
            GenerationOutcome::Failed(e) => reply.push_problem(&e),
        }
        reply
    }

    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    /// Tracker of in-flight dispatch tasks.
    pub fn dispatches(&self) -> &TaskTracker {
        &self.dispatches
    }

    /// Wait for every dispatch spawned so far to finish.
    ///
    /// Only meaningful after the scan loop has stopped; dispatches spawned
    /// while waiting are also awaited.
    pub async fn drain_dispatches(&self) {
        self.dispatches.close();
        self.dispatches.wait().await;
        self.dispatches.reopen();
    }
}

/// Running scan loop. Dropping the handle leaves the loop running.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ScannerState>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Current scan loop state.
    pub fn state(&self) -> ScannerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.clone()
    }

    /// Token that stops the scan loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the scan loop and wait for it to exit.
    ///
    /// In-flight dispatches are not cancelled.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take()
            && let Err(e) = join.await
        {
            error!(error = %e, "scan loop task failed");
        }
    }
}

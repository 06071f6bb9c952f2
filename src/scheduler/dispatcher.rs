//! Per-session dispatch task.
//!
//! One dispatch runs per selected session: wait out the quiet window if the
//! session was detected inside it, generate, deliver. Every failure ends only
//! this dispatch.

use crate::clock::Clock;
use crate::config::ConfigHandle;
use crate::error::RekindleError;
use crate::host::{MessageChain, MessageSink};
use crate::pipeline::{GenerationOutcome, GenerationPipeline, Suppression};
use crate::quiet_hours::{JitterSource, QuietHoursPolicy};
use crate::session::SessionKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How a dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The text was handed to the message sink.
    Delivered(String),
    /// Generation was skipped on purpose.
    Suppressed(Suppression),
    /// Generation or delivery failed.
    Failed(RekindleError),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Runs the deferral, generation and delivery steps for one session.
pub struct SessionDispatcher {
    config: ConfigHandle,
    pipeline: GenerationPipeline,
    sink: Arc<dyn MessageSink>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
}

impl SessionDispatcher {
    pub fn new(
        config: ConfigHandle,
        pipeline: GenerationPipeline,
        sink: Arc<dyn MessageSink>,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            config,
            pipeline,
            sink,
            clock,
            jitter,
        }
    }

    /// Deferral needed before generating, if the local time is in the quiet window.
    fn deferral(&self) -> Option<Duration> {
        let rules = match self.config.current() {
            Ok(config) => config.rules,
            Err(e) => {
                warn!(error = %e, "cannot read quiet hours, dispatching without deferral");
                return None;
            }
        };
        QuietHoursPolicy::new(rules.sleep_start_hour, rules.sleep_end_hour)
            .resolve_deferral(self.clock.now_local(), self.jitter.as_ref())
    }

    /// Run the dispatch to completion.
    ///
    /// Sleeping through the deferral suspends only this task.
    pub async fn dispatch(&self, session: SessionKey) -> DispatchOutcome {
        if let Some(delay) = self.deferral() {
            info!(
                session = %session,
                delay_secs = delay.as_secs(),
                "inside quiet hours, deferring dispatch"
            );
            tokio::time::sleep(delay).await;
        }

        match self.pipeline.generate(&session, false).await {
            GenerationOutcome::Produced(text) => {
                match self
                    .sink
                    .send_message(&session, MessageChain::text(text.clone()))
                    .await
                {
                    Ok(()) => {
                        info!(session = %session, "proactive message delivered");
                        DispatchOutcome::Delivered(text)
                    }
                    Err(e) => {
                        let err = RekindleError::Delivery(format!("{e:#}"));
                        error!(session = %session, error = %err, "proactive message not delivered");
                        DispatchOutcome::Failed(err)
                    }
                }
            }
            GenerationOutcome::Suppressed(reason) => DispatchOutcome::Suppressed(reason),
            GenerationOutcome::Failed(e) => DispatchOutcome::Failed(e),
        }
    }
}

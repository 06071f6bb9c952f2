//! Rekindle: proactive re-engagement for idle conversational sessions.
//!
//! Inbound events keep a per-session activity timestamp fresh. A background
//! scan loop picks sessions that have gone quiet for longer than a threshold
//! and spawns one dispatch per session:
//!
//! Inbound events → ActivityTracker → InactivityScanner → SessionDispatcher
//! → quiet-hours deferral → GenerationPipeline (topic, then chat) → MessageSink
//!
//! The host process supplies providers, conversation history and delivery
//! through the traits in [`host`]; [`scheduler::ProactiveScheduler`] wires
//! everything together.

pub mod activity;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod providers;
pub mod quiet_hours;
pub mod scheduler;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use activity::ActivityTracker;
pub use config::{ConfigHandle, RekindleConfig};
pub use error::{RekindleError, Result};
pub use pipeline::{GenerationOutcome, GenerationPipeline};
pub use quiet_hours::QuietHoursPolicy;
pub use scheduler::{ProactiveScheduler, SchedulerHandle};
pub use session::{InboundEvent, SessionKey};

//! Inactivity scanning and proactive dispatch.
//!
//! A single scan loop selects idle sessions and spawns one dispatch task per
//! session. Dispatches defer through quiet hours, run the generation pipeline
//! and deliver through the host's message sink.

pub mod dispatcher;
pub mod runtime;
pub mod scanner;

pub use dispatcher::{DispatchOutcome, SessionDispatcher};
pub use runtime::{ProactiveScheduler, ProactiveSchedulerBuilder, SchedulerHandle};
pub use scanner::{InactivityScanner, ScannerState};

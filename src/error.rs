//! Error types for the re-engagement scheduler.

/// Top-level error type for rekindle.
#[derive(Debug, thiserror::Error)]
pub enum RekindleError {
    /// A required provider id is unset or does not resolve to a provider.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A provider call failed (network, model or protocol error).
    #[error("provider `{provider}` call failed: {message}")]
    ProviderCall {
        /// Provider id the call was made against.
        provider: String,
        /// Underlying failure description.
        message: String,
    },

    /// A provider answered but returned nothing usable.
    #[error("provider `{0}` returned an empty result")]
    EmptyResult(String),

    /// Conversation history could not be fetched. Never fatal.
    #[error("history fetch failed: {0}")]
    HistoryFetch(String),

    /// The chat prompt template could not be rendered.
    #[error("template error: {0}")]
    Template(String),

    /// Outbound delivery to the message sink failed.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Transient failure inside the scan loop.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration file could not be parsed or serialized.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RekindleError>;

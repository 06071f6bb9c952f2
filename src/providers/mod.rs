//! Reference completion providers.

pub mod openai_compat;
pub mod registry;

pub use openai_compat::OpenAiCompatProvider;
pub use registry::StaticProviderRegistry;

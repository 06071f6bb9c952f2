//! Provider lookup by id.

use crate::config::EndpointConfig;
use crate::host::{CompletionProvider, ProviderRegistry};
use crate::providers::OpenAiCompatProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry over a fixed set of providers, built once at startup.
#[derive(Default, Clone)]
pub struct StaticProviderRegistry {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
}

impl StaticProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id, replacing any previous one.
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.insert(provider);
        self
    }

    pub fn insert(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.providers.insert(provider.id().to_owned(), provider);
    }

    /// Build an [`OpenAiCompatProvider`] for every endpoint with an id.
    ///
    /// Endpoints without an id, or whose client cannot be built, are skipped
    /// with a warning.
    pub fn from_endpoints(endpoints: &[EndpointConfig]) -> Self {
        let mut registry = Self::new();
        for endpoint in endpoints {
            if endpoint.id.trim().is_empty() {
                warn!(base_url = %endpoint.base_url, "skipping endpoint without id");
                continue;
            }
            match OpenAiCompatProvider::from_endpoint(endpoint) {
                Ok(provider) => {
                    info!(provider = %endpoint.id, model = %endpoint.model, "registered provider");
                    registry.insert(Arc::new(provider));
                }
                Err(e) => {
                    warn!(provider = %endpoint.id, error = %e, "failed to build provider");
                }
            }
        }
        registry
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn provider(&self, id: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(id).cloned()
    }
}

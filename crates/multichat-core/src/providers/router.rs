//! Routes completion requests to the backend registered for their provider id

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CompletionError;

use super::types::{Completion, CompletionRequest, CompletionService, LlmProvider};

/// A [`CompletionService`] backed by one HTTP provider per provider id
#[derive(Default)]
pub struct ProviderRouter {
    providers: HashMap<String, Box<dyn LlmProvider>>,
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ProviderRouter")
            .field("providers", &ids)
            .finish()
    }
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own provider name, replacing any previous one
    pub fn register(&mut self, provider: Box<dyn LlmProvider>) {
        let name = provider.provider_name().to_string();
        debug!("Registered completion backend '{}'", name);
        self.providers.insert(name, provider);
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// Number of registered backends
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl CompletionService for ProviderRouter {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let provider = self
            .providers
            .get(&request.provider)
            .ok_or_else(|| CompletionError::UnknownProvider(request.provider.clone()))?;
        provider.complete(request).await
    }
}

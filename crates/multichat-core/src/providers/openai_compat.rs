//! OpenAI-compatible provider for xAI, Together, Groq, LM Studio, etc.
//!
//! Reuses the OpenAI wire format with a configurable base URL.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::CompletionError;

use super::openai::OpenAiProvider;
use super::types::{Completion, CompletionRequest, LlmProvider};

pub const XAI_BASE_URL: &str = "https://api.x.ai";

/// OpenAI-compatible provider; wraps [`OpenAiProvider`] with a custom name
pub struct OpenAiCompatProvider {
    inner: OpenAiProvider,
    name: String,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    ///
    /// - `name`: provider id the router dispatches on (e.g. "xai", "groq")
    /// - `base_url`: the endpoint root, without the `/v1` suffix
    pub fn new(client: Client, name: String, api_key: String, base_url: String) -> Self {
        Self {
            inner: OpenAiProvider::new(client, api_key, base_url),
            name,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        self.inner.complete_as(&self.name, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compat_provider_name() {
        let p = OpenAiCompatProvider::new(
            Client::new(),
            "xai".to_string(),
            "".to_string(),
            XAI_BASE_URL.to_string(),
        );
        assert_eq!(p.provider_name(), "xai");
    }

    #[test]
    fn test_compat_provider_debug_hides_key() {
        let p = OpenAiCompatProvider::new(
            Client::new(),
            "groq".to_string(),
            "gsk_secret".to_string(),
            "https://api.groq.com/openai".to_string(),
        );
        let debug = format!("{:?}", p);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("groq"));
    }
}

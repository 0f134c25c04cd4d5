//! OpenAI chat-completions provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompletionError;

use super::types::{
    ChatMessage, Completion, CompletionRequest, CompletionUsage, LlmProvider, joined_text,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert provider-agnostic messages to OpenAI wire format.
    /// System messages stay inline; the chat API accepts them as a role.
    fn to_openai_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn build_body(request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone(),
            messages: Self::to_openai_messages(&request.messages),
            max_tokens: request.max_tokens,
        }
    }

    /// Convert OpenAI response to a single text completion
    fn from_openai_response(
        provider: &str,
        resp: OpenAiApiResponse,
    ) -> Result<Completion, CompletionError> {
        let choice = resp.choices.into_iter().next().ok_or_else(|| {
            CompletionError::malformed(provider, "response had no choices")
        })?;

        let text = joined_text(provider, choice.message.content)?;

        let usage = resp.usage.map_or(CompletionUsage::default(), |u| CompletionUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(Completion { text, usage })
    }

    /// Issue the request, labelling errors with `provider`
    pub(crate) async fn complete_as(
        &self,
        provider: &str,
        request: &CompletionRequest,
    ) -> Result<Completion, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::build_body(request);

        debug!(
            "{} request: model={}, messages={}",
            provider,
            body.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Status {
                provider: provider.to_string(),
                status: status.as_u16(),
                body: error_text,
            });
        }

        let api_response: OpenAiApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::malformed(provider, e))?;

        debug!(
            "{} response: choices={}, finish_reason={:?}",
            provider,
            api_response.choices.len(),
            api_response.choices.first().map(|c| &c.finish_reason)
        );

        Self::from_openai_response(provider, api_response)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        self.complete_as("openai", request).await
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Clone, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiApiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

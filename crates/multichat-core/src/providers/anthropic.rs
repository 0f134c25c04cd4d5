//! Anthropic Claude provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompletionError;

use super::types::{
    ChatMessage, ChatRole, Completion, CompletionRequest, CompletionUsage, LlmProvider, joined_text,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// The messages API rejects requests without a cap
const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert provider-agnostic messages to Anthropic wire format
    fn to_anthropic_messages<'a>(
        messages: impl Iterator<Item = &'a ChatMessage>,
    ) -> Vec<AnthropicMessage> {
        messages
            .map(|m| AnthropicMessage {
                role: match m.role {
                    ChatRole::Assistant => "assistant".to_string(),
                    _ => "user".to_string(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    fn build_body(request: &CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            system: request.system_prompt(),
            messages: Self::to_anthropic_messages(request.conversation()),
        }
    }

    /// Convert Anthropic response to a single text completion
    fn from_anthropic_response(resp: AnthropicApiResponse) -> Result<Completion, CompletionError> {
        let text = joined_text(
            "anthropic",
            resp.content.into_iter().filter_map(|b| match b {
                AnthropicBlock::Text { text } => Some(text),
                AnthropicBlock::Other => None,
            }),
        )?;
        Ok(Completion {
            text,
            usage: resp
                .usage
                .map_or(CompletionUsage::default(), |u| CompletionUsage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                }),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(request);

        debug!(
            "Anthropic request: model={}, messages={}, max_tokens={}",
            body.model,
            body.messages.len(),
            body.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::transport("anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Status {
                provider: "anthropic".to_string(),
                status: status.as_u16(),
                body: error_text,
            });
        }

        let api_response: AnthropicApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::malformed("anthropic", e))?;

        debug!(
            "Anthropic response: blocks={}, stop_reason={:?}",
            api_response.content.len(),
            api_response.stop_reason
        );

        Self::from_anthropic_response(api_response)
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    /// Thinking and tool blocks carry no reply text
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicApiResponse {
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<ChatMessage>, max_tokens: Option<u32>) -> CompletionRequest {
        CompletionRequest {
            model: "claude-opus-4-5".to_string(),
            provider: "anthropic".to_string(),
            messages,
            max_tokens,
        }
    }

    #[test]
    fn test_system_lifted_out_of_messages() {
        let body = AnthropicProvider::build_body(&request(
            vec![ChatMessage::system("attribute me"), ChatMessage::user("transcript")],
            Some(8096),
        ));
        assert_eq!(body.system.as_deref(), Some("attribute me"));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.max_tokens, 8096);
    }

    #[test]
    fn test_fallback_max_tokens() {
        let body = AnthropicProvider::build_body(&request(vec![ChatMessage::user("hi")], None));
        assert_eq!(body.max_tokens, FALLBACK_MAX_TOKENS);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_from_anthropic_response_joins_text_blocks() {
        let resp: AnthropicApiResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": " there"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .unwrap();
        let completion = AnthropicProvider::from_anthropic_response(resp).unwrap();
        assert_eq!(completion.text, "Hello there");
        assert_eq!(completion.usage.input_tokens, 10);
    }

    #[test]
    fn test_from_anthropic_response_empty() {
        let resp: AnthropicApiResponse = serde_json::from_value(serde_json::json!({
            "content": [],
            "stop_reason": "max_tokens"
        }))
        .unwrap();
        assert!(matches!(
            AnthropicProvider::from_anthropic_response(resp),
            Err(CompletionError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_anthropic_provider_debug_hides_key() {
        let provider = AnthropicProvider::new(
            Client::new(),
            "sk-secret".to_string(),
            DEFAULT_BASE_URL.to_string(),
        );
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
    }
}

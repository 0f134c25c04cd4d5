//! Google Gemini provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompletionError;

use super::types::{
    ChatMessage, ChatRole, Completion, CompletionRequest, CompletionUsage, LlmProvider, joined_text,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert provider-agnostic messages to Gemini wire format
    fn to_gemini_contents<'a>(
        messages: impl Iterator<Item = &'a ChatMessage>,
    ) -> Vec<GeminiContent> {
        messages
            .map(|m| GeminiContent {
                role: match m.role {
                    ChatRole::Assistant => "model".to_string(),
                    _ => "user".to_string(),
                },
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                }],
            })
            .collect()
    }

    fn build_body(request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: Self::to_gemini_contents(request.conversation()),
            system_instruction: request.system_prompt().map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart { text: Some(text) }],
            }),
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: max,
            }),
        }
    }

    /// Convert Gemini response to a single text completion
    fn from_gemini_response(resp: GeminiApiResponse) -> Result<Completion, CompletionError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::malformed("gemini", "response had no candidates"))?;

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        let text = joined_text("gemini", parts.into_iter().filter_map(|p| p.text))?;

        let usage = resp
            .usage_metadata
            .map_or(CompletionUsage::default(), |u| CompletionUsage {
                input_tokens: u.prompt_token_count.unwrap_or(0),
                output_tokens: u.candidates_token_count.unwrap_or(0),
            });

        Ok(Completion { text, usage })
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = Self::build_body(request);

        debug!(
            "Gemini request: model={}, contents={}",
            request.model,
            body.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::transport("gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Status {
                provider: "gemini".to_string(),
                status: status.as_u16(),
                body: error_text,
            });
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::malformed("gemini", e))?;

        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Self::from_gemini_response(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_body_with_system_instruction() {
        let req = CompletionRequest {
            model: "gemini-3-pro-preview".to_string(),
            provider: "gemini".to_string(),
            messages: vec![ChatMessage::system("only your answer"), ChatMessage::user("hi")],
            max_tokens: None,
        };
        let json = serde_json::to_value(GoogleProvider::build_body(&req)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "only your answer");
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_assistant_maps_to_model_role() {
        let msgs = [ChatMessage {
            role: ChatRole::Assistant,
            content: "earlier reply".to_string(),
        }];
        let contents = GoogleProvider::to_gemini_contents(msgs.iter());
        assert_eq!(contents[0].role, "model");
    }

    #[test]
    fn test_from_gemini_response_text() {
        let resp: GeminiApiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        }))
        .unwrap();
        let completion = GoogleProvider::from_gemini_response(resp).unwrap();
        assert_eq!(completion.text, "Hi there");
        assert_eq!(completion.usage.input_tokens, 4);
    }

    #[test]
    fn test_from_gemini_response_blocked() {
        let resp: GeminiApiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(
            GoogleProvider::from_gemini_response(resp),
            Err(CompletionError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_from_gemini_response_no_candidates() {
        let resp: GeminiApiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(GoogleProvider::from_gemini_response(resp).is_err());
    }

    #[test]
    fn test_google_provider_debug_hides_key() {
        let p = GoogleProvider::new(
            Client::new(),
            "AIza-secret".to_string(),
            DEFAULT_BASE_URL.to_string(),
        );
        assert!(!format!("{:?}", p).contains("AIza-secret"));
    }
}

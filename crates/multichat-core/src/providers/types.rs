//! Provider-agnostic types for the completion boundary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/// Provider-agnostic chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One non-streaming completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub provider: String,
    pub messages: Vec<ChatMessage>,
    /// Only set for providers that require an explicit cap
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Concatenated system messages, or `None` if there are none
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages other than system messages, in order
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != ChatRole::System)
    }
}

/// Token usage reported by a provider, when it reports any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single text reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: CompletionUsage,
}

/// The external completion service: one request in, one text reply or an error out
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}

/// A concrete HTTP backend for one provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "anthropic", "openai")
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}

/// Join reply fragments into one text, failing when nothing non-blank came back
pub(crate) fn joined_text(
    provider: &str,
    parts: impl IntoIterator<Item = String>,
) -> Result<String, CompletionError> {
    let text = parts.into_iter().collect::<Vec<_>>().join("");
    if text.trim().is_empty() {
        return Err(CompletionError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    Ok(text)
}

//! Completion-service boundary and its HTTP adapters
//!
//! Supports Anthropic, OpenAI, Google Gemini, and any OpenAI-compatible endpoint.
//! Adapters implement [`LlmProvider`] and are composed via [`ProviderRouter`],
//! which is the [`CompletionService`] the fan-out talks to.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod openai_compat;
pub mod router;
pub mod types;

pub use router::ProviderRouter;
pub use types::{
    ChatMessage, ChatRole, Completion, CompletionRequest, CompletionService, CompletionUsage,
    LlmProvider,
};

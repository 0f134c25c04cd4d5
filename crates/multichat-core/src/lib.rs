//! multichat-core - ask several LLM providers at once
//!
//! This crate provides:
//! - A fixed registry of providers and credential checks
//! - A JSON session store tolerant of missing or corrupt files
//! - Transcript rendering and per-provider prompt building for continued sessions
//! - Concurrent fan-out with per-provider failure isolation, yielding results as they finish
//! - HTTP adapters for Anthropic, OpenAI, Gemini and OpenAI-compatible APIs

pub mod error;
pub mod exchange;
pub mod fanout;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod session;
pub mod transcript;

// Re-export main types for convenience
pub use error::{CompletionError, RunError, SessionError};
pub use exchange::{ExchangeReport, record_replies, run_exchange, update_session};
pub use fanout::{DispatchConfig, FanOut, ProviderResult, dispatch};
pub use prompt::{Mode, PromptBuilder};
pub use providers::{CompletionService, ProviderRouter};
pub use registry::{Backend, DisplayColor, ProviderDescriptor, ProviderOverride, list_providers};
pub use session::{Role, Session, SessionStore, Turn};

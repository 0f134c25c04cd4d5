//! Error types shared across multichat-core

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a single completion call produced no reply.
///
/// Carried as data inside [`crate::fanout::ProviderResult`]; the fan-out
/// never propagates it further.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompletionError {
    #[error("request to {provider} failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} API returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("could not parse {provider} response: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("{provider} returned an empty reply")]
    EmptyResponse { provider: String },

    #[error("no backend registered for provider '{0}'")]
    UnknownProvider(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("call aborted: {0}")]
    Aborted(String),
}

impl CompletionError {
    pub(crate) fn transport(provider: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(provider: &str, err: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure to persist a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create session directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Conditions that end a run before anything is dispatched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("no message provided")]
    NoMessage,

    #[error("no provider has credentials configured")]
    NoProviderAvailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = CompletionError::Status {
            provider: "openai".to_string(),
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "openai API returned status 429: rate limited"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = CompletionError::TimedOut(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out after 5s");
    }
}

//! Concurrent dispatch of one prompt to many providers
//!
//! Every provider call runs in its own task and reports into a single channel,
//! so results are consumed in the order they finish rather than the order they
//! were issued. A failing, slow or panicking provider never affects its siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::CompletionError;
use crate::prompt::PromptBuilder;
use crate::providers::{CompletionRequest, CompletionService};
use crate::registry::ProviderDescriptor;

/// Configuration for a dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound per provider call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

/// Outcome of one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    pub display_name: String,
    pub provider_id: String,
    pub model_display_name: String,
    pub model_id: String,
    pub elapsed: Duration,
    pub outcome: Result<String, CompletionError>,
}

impl ProviderResult {
    fn new(
        provider: &ProviderDescriptor,
        elapsed: Duration,
        outcome: Result<String, CompletionError>,
    ) -> Self {
        Self {
            display_name: provider.display_name.clone(),
            provider_id: provider.provider_id.clone(),
            model_display_name: provider.model_display_name.clone(),
            model_id: provider.model_id.clone(),
            elapsed,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Reply text, empty on failure
    pub fn content(&self) -> &str {
        self.outcome.as_deref().unwrap_or("")
    }

    pub fn error(&self) -> Option<&CompletionError> {
        self.outcome.as_ref().err()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Results of an in-flight dispatch, yielded as each call completes
pub struct FanOut {
    rx: mpsc::Receiver<ProviderResult>,
    remaining: usize,
}

impl FanOut {
    /// Next finished result, or `None` once every call is accounted for
    pub async fn next(&mut self) -> Option<ProviderResult> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.rx.recv().await?;
        self.remaining -= 1;
        Some(result)
    }

    /// Calls still outstanding
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Drain every remaining result in completion order
    pub async fn collect(mut self) -> Vec<ProviderResult> {
        let mut results = Vec::with_capacity(self.remaining);
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }
}

/// Issue one completion request per provider, all at once.
///
/// Must be called from within a tokio runtime.
pub fn dispatch(
    providers: &[ProviderDescriptor],
    prompts: &PromptBuilder,
    service: Arc<dyn CompletionService>,
    config: &DispatchConfig,
) -> FanOut {
    let (tx, rx) = mpsc::channel(providers.len().max(1));

    for provider in providers {
        let request = CompletionRequest {
            model: provider.model_id.clone(),
            provider: provider.provider_id.clone(),
            messages: prompts.build(provider),
            max_tokens: provider.max_tokens,
        };
        debug!(
            "Dispatching to {} ({}) with {} messages",
            provider.display_name,
            provider.model_id,
            request.messages.len()
        );

        let provider = provider.clone();
        let service = service.clone();
        let tx = tx.clone();
        let timeout = config.call_timeout;

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = call_provider(service, request, timeout).await;
            let elapsed = started.elapsed();

            match &outcome {
                Ok(text) => info!(
                    "{} replied in {:.2}s ({} chars)",
                    provider.display_name,
                    elapsed.as_secs_f64(),
                    text.len()
                ),
                Err(e) => warn!(
                    "{} failed after {:.2}s: {}",
                    provider.display_name,
                    elapsed.as_secs_f64(),
                    e
                ),
            }

            if tx
                .send(ProviderResult::new(&provider, elapsed, outcome))
                .await
                .is_err()
            {
                debug!("Result for {} dropped: receiver closed", provider.display_name);
            }
        });
    }

    FanOut {
        rx,
        remaining: providers.len(),
    }
}

/// Run one call in its own task so a panic inside the service surfaces as an error
async fn call_provider(
    service: Arc<dyn CompletionService>,
    request: CompletionRequest,
    timeout: Option<Duration>,
) -> Result<String, CompletionError> {
    let mut call = tokio::spawn(async move { service.complete(&request).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut call).await {
            Ok(joined) => joined,
            Err(_) => {
                call.abort();
                return Err(CompletionError::TimedOut(limit));
            }
        },
        None => call.await,
    };

    match joined {
        Ok(result) => result.map(|completion| completion.text),
        Err(e) => Err(CompletionError::Aborted(e.to_string())),
    }
}

//! One complete run: load, prompt, fan out, record, save

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{RunError, SessionError};
use crate::fanout::{self, DispatchConfig, ProviderResult};
use crate::prompt::{Mode, PromptBuilder};
use crate::providers::CompletionService;
use crate::registry::ProviderDescriptor;
use crate::session::{Session, SessionStore, Turn};

/// Append one model turn per successful result, in the order given
pub fn record_replies(session: &mut Session, results: &[ProviderResult]) -> usize {
    let mut added = 0;
    for result in results {
        if let Ok(content) = &result.outcome {
            session.push(Turn::model(result.model_id.clone(), content.clone()));
            added += 1;
        }
    }
    added
}

/// Record replies and persist the session
pub fn update_session(
    store: &SessionStore,
    session: &mut Session,
    results: &[ProviderResult],
) -> Result<(), SessionError> {
    let added = record_replies(session, results);
    debug!(
        "Recorded {} of {} replies; session now has {} turns",
        added,
        results.len(),
        session.len()
    );
    store.save(session)
}

/// What a run produced
#[derive(Debug)]
pub struct ExchangeReport {
    /// Every provider result, in completion order
    pub results: Vec<ProviderResult>,
    /// The session as it was saved (or attempted)
    pub session: Session,
    pub saved: Result<(), SessionError>,
}

impl ExchangeReport {
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// Run one exchange against `providers`.
///
/// `on_result` is called for each provider as soon as it finishes, before the
/// slower ones are done. Nothing is read from or written to `store` when the
/// run is rejected up front.
pub async fn run_exchange<F>(
    store: &SessionStore,
    mode: Mode,
    message: &str,
    providers: &[ProviderDescriptor],
    service: Arc<dyn CompletionService>,
    config: &DispatchConfig,
    mut on_result: F,
) -> Result<ExchangeReport, RunError>
where
    F: FnMut(&ProviderResult),
{
    let message = message.trim();
    if message.is_empty() {
        return Err(RunError::NoMessage);
    }
    if providers.is_empty() {
        return Err(RunError::NoProviderAvailable);
    }

    let mut session = store.load();
    let prompts = PromptBuilder::prepare(mode, &mut session, message);

    info!(
        "Asking {} providers ({:?} mode, {} turns of context)",
        providers.len(),
        mode,
        session.len()
    );

    let mut fanout = fanout::dispatch(providers, &prompts, service, config);
    let mut results = Vec::with_capacity(providers.len());
    while let Some(result) = fanout.next().await {
        on_result(&result);
        results.push(result);
    }

    let saved = update_session(store, &mut session, &results);
    if let Err(e) = &saved {
        warn!("Session not saved: {}", e);
    }

    Ok(ExchangeReport {
        results,
        session,
        saved,
    })
}

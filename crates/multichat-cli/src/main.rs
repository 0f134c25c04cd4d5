use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod output;

use config::MultichatConfig;
use multichat_core::registry::{env_lookup, partition_available};
use multichat_core::{
    CompletionService, DispatchConfig, Mode, ProviderDescriptor, RunError, SessionStore,
    run_exchange,
};

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

const USAGE: &str = "Usage: multichat [-c|--continue] <message>\n       \
                     <command> | multichat [-c] [message]";

#[derive(Parser)]
#[command(name = "multichat")]
#[command(version)]
#[command(about = "Ask several LLMs the same question at once")]
struct Cli {
    /// Continue the previous session instead of starting a new one
    #[arg(short = 'c', long = "continue")]
    continue_session: bool,

    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-provider timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// The message to send; piped stdin is prepended
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    message: Vec<String>,
}

/// What one run was asked to do, after arguments and stdin are combined
struct Invocation {
    mode: Mode,
    message: Option<String>,
    timeout: Option<Duration>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("multichat=debug,multichat_core=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = MultichatConfig::load(&cli.config)?;
    let piped = input::read_piped_stdin()?;

    let invocation = Invocation {
        mode: if cli.continue_session {
            Mode::Continue
        } else {
            Mode::New
        },
        message: input::compose_message(piped.as_deref(), &cli.message),
        timeout: cli
            .timeout
            .or(config.dispatch.timeout_secs)
            .map(Duration::from_secs),
    };

    let store = SessionStore::new(config.session_path(env_lookup));
    debug!("Session file: {}", store.path().display());

    execute(
        &config.providers(),
        env_lookup,
        invocation,
        &store,
        |available| {
            let client = reqwest::Client::builder()
                .build()
                .context("Failed to build HTTP client")?;
            let router = config.build_router(available, env_lookup, client)?;
            Ok(Arc::new(router) as Arc<dyn CompletionService>)
        },
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await
}

/// Print the status line, validate the invocation, then run the exchange.
///
/// `connect` builds the completion service for the available providers and is
/// only called once a run is going ahead. Returns the process exit code.
async fn execute<L, C>(
    providers: &[ProviderDescriptor],
    lookup: L,
    invocation: Invocation,
    store: &SessionStore,
    connect: C,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<u8>
where
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&[ProviderDescriptor]) -> Result<Arc<dyn CompletionService>>,
{
    let (available, missing) = partition_available(providers, &lookup);
    writeln!(out, "{}", output::status_line(providers, &available))?;
    for line in output::missing_lines(&missing) {
        writeln!(err, "{}", line)?;
    }

    let Some(message) = invocation.message else {
        writeln!(err, "{}", USAGE)?;
        return Ok(EXIT_FAILURE);
    };

    if available.is_empty() {
        writeln!(
            err,
            "Error: no provider credentials found. Set at least one of: {}",
            output::missing_hint(&missing)
        )?;
        return Ok(EXIT_FAILURE);
    }

    let service = connect(&available)?;
    let dispatch = DispatchConfig {
        call_timeout: invocation.timeout,
    };

    let report = run_exchange(
        store,
        invocation.mode,
        &message,
        &available,
        service,
        &dispatch,
        |result| {
            let color = available
                .iter()
                .find(|p| p.provider_id == result.provider_id)
                .and_then(|p| p.display_color);
            let _ = write!(out, "\n{}", output::format_result(result, color));
            let _ = out.flush();
        },
    )
    .await;

    match report {
        Ok(report) => {
            if let Err(e) = &report.saved {
                warn!("Session not saved: {}", e);
                writeln!(
                    err,
                    "Warning: could not save session to {}: {}",
                    store.path().display(),
                    e
                )?;
            }
            debug!(
                "{} succeeded, {} failed",
                report.successes(),
                report.failures()
            );
            Ok(EXIT_OK)
        }
        Err(RunError::NoMessage) => {
            writeln!(err, "{}", USAGE)?;
            Ok(EXIT_FAILURE)
        }
        Err(e) => {
            writeln!(err, "Error: {}", e)?;
            Ok(EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use multichat_core::CompletionError;
    use multichat_core::list_providers;
    use multichat_core::providers::{Completion, CompletionRequest, CompletionUsage};
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Answers every request with a reply naming the model
    struct CannedService;

    #[async_trait]
    impl CompletionService for CannedService {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<Completion, CompletionError> {
            Ok(Completion {
                text: format!("hello from {}", request.model),
                usage: CompletionUsage::default(),
            })
        }
    }

    struct Captured {
        code: u8,
        out: String,
        err: String,
    }

    async fn execute_with(
        env: &[(&str, &str)],
        message: Option<&str>,
        store: &SessionStore,
    ) -> Captured {
        colored::control::set_override(false);
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let invocation = Invocation {
            mode: Mode::New,
            message: message.map(str::to_string),
            timeout: None,
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = execute(
            &list_providers(),
            |name: &str| env.get(name).cloned(),
            invocation,
            store,
            |_| Ok(Arc::new(CannedService) as Arc<dyn CompletionService>),
            &mut out,
            &mut err,
        )
        .await
        .unwrap();
        Captured {
            code,
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
        }
    }

    fn store_in(temp: &TempDir) -> SessionStore {
        SessionStore::new(temp.path().join("multichat").join("session.json"))
    }

    #[test]
    fn test_parse_continue_and_words() {
        let cli = Cli::parse_from(["multichat", "-c", "what", "about", "-x?"]);
        assert!(cli.continue_session);
        assert_eq!(cli.message, vec!["what", "about", "-x?"]);
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::parse_from(["multichat", "--timeout", "30", "--debug", "hi"]);
        assert!(!cli.continue_session);
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.debug);
        assert_eq!(cli.message, vec!["hi"]);
    }

    #[test]
    fn test_parse_no_message() {
        let cli = Cli::parse_from(["multichat"]);
        assert!(cli.message.is_empty());
    }

    #[tokio::test]
    async fn test_no_message_prints_status_then_usage() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let run = execute_with(&[("OPENAI_API_KEY", "sk-1")], None, &store).await;

        assert_eq!(run.code, 1);
        assert_eq!(run.out, "✗ Anthropic · ✗ Gemini · ✓ OpenAI · ✗ xAI\n");
        assert!(run.err.contains("Usage: multichat"));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_no_credentials_fails_without_touching_session() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let run = execute_with(&[], Some("hello"), &store).await;

        assert_eq!(run.code, 1);
        assert!(run.err.contains("GPT-5.2: OPENAI_API_KEY missing"));
        assert!(run.err.contains("no provider credentials found"));
        assert!(run.err.contains("XAI_API_KEY"));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_save_failure_is_a_warning() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let store = SessionStore::new(blocker.join("session.json"));

        let run = execute_with(&[("OPENAI_API_KEY", "sk-1")], Some("hi"), &store).await;

        assert_eq!(run.code, 0);
        assert!(run.out.contains("--- GPT-5.2 ("));
        assert!(run.out.contains("hello from gpt-5.2"));
        assert!(run.err.contains("Warning: could not save session"));
    }

    #[tokio::test]
    async fn test_successful_run_saves_session() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let run = execute_with(
            &[("ANTHROPIC_API_KEY", "a"), ("XAI_API_KEY", "x")],
            Some("hi"),
            &store,
        )
        .await;

        assert_eq!(run.code, 0);
        assert!(!run.err.contains("Warning"));
        assert!(run.err.contains("Gemini 3 Pro: GEMINI_API_KEY missing"));
        let saved = store.load();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved.turns[0], multichat_core::Turn::user("hi"));
    }
}

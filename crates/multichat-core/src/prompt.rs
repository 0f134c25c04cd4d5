//! Per-provider prompt construction for new and continued sessions

use tracing::debug;

use crate::providers::ChatMessage;
use crate::registry::ProviderDescriptor;
use crate::session::{Session, Turn};
use crate::transcript;

/// How this run treats existing history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Discard history and ask the bare question
    #[default]
    New,
    /// Append to history and replay the full transcript
    Continue,
}

/// Attribution instruction sent as the system message in continue mode
pub fn attribution_instruction(model_id: &str) -> String {
    format!(
        "You are {model_id}, one of several AI models taking part in a shared conversation. \
         The transcript below labels each user message with [user] and each model reply with \
         the model's identifier in brackets. Your reply will be automatically attributed to \
         [{model_id}], so do not add a label or speak for the other participants. \
         Respond only with your own answer to the latest user message."
    )
}

/// Snapshot of the session taken once per run, from which every provider's
/// messages are built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    input: String,
    transcript: Option<String>,
}

impl PromptBuilder {
    /// Apply the mode's one mutation to `session` and capture the prompt base.
    ///
    /// New: the session becomes exactly one user turn. Continue: the user turn is
    /// appended and the updated transcript is rendered once.
    pub fn prepare(mode: Mode, session: &mut Session, input: &str) -> Self {
        match mode {
            Mode::New => {
                session.reset();
                session.push(Turn::user(input));
                Self {
                    input: input.to_string(),
                    transcript: None,
                }
            }
            Mode::Continue => {
                session.push(Turn::user(input));
                let transcript = transcript::render(&session.turns);
                debug!(
                    "Continuing session: {} turns, transcript {} chars",
                    session.len(),
                    transcript.len()
                );
                Self {
                    input: input.to_string(),
                    transcript: Some(transcript),
                }
            }
        }
    }

    /// The rendered transcript, present only in continue mode
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// Messages to send to `provider`
    pub fn build(&self, provider: &ProviderDescriptor) -> Vec<ChatMessage> {
        match &self.transcript {
            None => vec![ChatMessage::user(self.input.clone())],
            Some(transcript) => vec![
                ChatMessage::system(attribution_instruction(&provider.model_id)),
                ChatMessage::user(transcript.clone()),
            ],
        }
    }
}

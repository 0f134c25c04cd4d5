//! Known providers and credential checks

use serde::{Deserialize, Serialize};

/// Terminal color used to tell providers apart in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

/// Wire protocol a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Anthropic,
    Gemini,
    OpenAi,
    /// OpenAI-compatible chat completions at api.x.ai
    Xai,
}

/// Static description of one provider/model pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub display_name: String,
    pub provider_id: String,
    pub model_display_name: String,
    pub model_id: String,
    pub credential_var: String,
    pub backend: Backend,
    pub display_color: Option<DisplayColor>,
    /// Response-length cap sent only to providers whose API requires one
    pub max_tokens: Option<u32>,
}

impl ProviderDescriptor {
    fn builtin(
        display_name: &str,
        provider_id: &str,
        model_display_name: &str,
        model_id: &str,
        credential_var: &str,
        backend: Backend,
        display_color: DisplayColor,
    ) -> Self {
        Self {
            display_name: display_name.to_string(),
            provider_id: provider_id.to_string(),
            model_display_name: model_display_name.to_string(),
            model_id: model_id.to_string(),
            credential_var: credential_var.to_string(),
            backend,
            display_color: Some(display_color),
            max_tokens: None,
        }
    }

    fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Look up this provider's credential through `lookup`. Empty values count as missing.
    pub fn credential_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.credential_var).filter(|v| !v.trim().is_empty())
    }

    pub fn available_with<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.credential_with(lookup).is_some()
    }

    /// Credential from the process environment
    pub fn credential(&self) -> Option<String> {
        self.credential_with(env_lookup)
    }

    /// True iff the credential variable is set and non-empty
    pub fn available(&self) -> bool {
        self.credential().is_some()
    }

    /// Apply a user override. Returns `None` when the override disables the provider.
    pub fn apply_override(mut self, ov: &ProviderOverride) -> Option<Self> {
        if ov.enabled == Some(false) {
            return None;
        }
        if let Some(model) = &ov.model {
            self.model_id = model.clone();
            // A new model id without a new label would show the old model's name
            self.model_display_name = ov
                .model_display_name
                .clone()
                .unwrap_or_else(|| model.clone());
        } else if let Some(label) = &ov.model_display_name {
            self.model_display_name = label.clone();
        }
        if let Some(max_tokens) = ov.max_tokens {
            self.max_tokens = Some(max_tokens);
        }
        if let Some(color) = ov.display_color {
            self.display_color = Some(color);
        }
        Some(self)
    }
}

/// Per-provider settings a user may change from the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOverride {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub model_display_name: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub display_color: Option<DisplayColor>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// All known providers in their fixed display order
pub fn list_providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::builtin(
            "Anthropic",
            "anthropic",
            "Claude Opus 4.5",
            "claude-opus-4-5",
            "ANTHROPIC_API_KEY",
            Backend::Anthropic,
            DisplayColor::Yellow,
        )
        .with_max_tokens(8096),
        ProviderDescriptor::builtin(
            "Gemini",
            "gemini",
            "Gemini 3 Pro",
            "gemini-3-pro-preview",
            "GEMINI_API_KEY",
            Backend::Gemini,
            DisplayColor::Blue,
        ),
        ProviderDescriptor::builtin(
            "OpenAI",
            "openai",
            "GPT-5.2",
            "gpt-5.2",
            "OPENAI_API_KEY",
            Backend::OpenAi,
            DisplayColor::Green,
        ),
        ProviderDescriptor::builtin(
            "xAI",
            "xai",
            "Grok 4.1",
            "grok-4.1-thinking",
            "XAI_API_KEY",
            Backend::Xai,
            DisplayColor::Magenta,
        ),
    ]
}

/// Split providers into (available, missing), preserving registry order in both
pub fn partition_available<F>(
    providers: &[ProviderDescriptor],
    lookup: F,
) -> (Vec<ProviderDescriptor>, Vec<ProviderDescriptor>)
where
    F: Fn(&str) -> Option<String>,
{
    providers
        .iter()
        .cloned()
        .partition(|p| p.available_with(&lookup))
}

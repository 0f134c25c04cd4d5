use anyhow::{Context, Result};
use multichat_core::providers::anthropic::{self, AnthropicProvider};
use multichat_core::providers::google::{self, GoogleProvider};
use multichat_core::providers::openai::{self, OpenAiProvider};
use multichat_core::providers::openai_compat::{self, OpenAiCompatProvider};
use multichat_core::providers::{LlmProvider, ProviderRouter};
use multichat_core::{Backend, ProviderDescriptor, ProviderOverride, list_providers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache-root override honored on every platform
pub const CACHE_HOME_ENV: &str = "XDG_CACHE_HOME";
/// Local application-data override, consulted on Windows only
pub const LOCAL_APP_DATA_ENV: &str = "LOCALAPPDATA";

const SESSION_SUBDIR: &str = "multichat";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultichatConfig {
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub session: SessionSettings,
    /// Keyed by provider id
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Explicit session file, bypassing cache-directory resolution
    #[serde(default)]
    pub path: Option<PathBuf>,
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("multichat")
}

impl MultichatConfig {
    /// Load the config file. A missing default file yields defaults; a missing
    /// explicitly requested file is an error.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(p) => p.clone(),
            None => {
                let default = config_dir().join("config.toml");
                if !default.exists() {
                    debug!("No config at {}, using defaults", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        let known: Vec<String> = list_providers().into_iter().map(|p| p.provider_id).collect();
        for id in config.providers.keys() {
            if !known.contains(id) {
                warn!(
                    "Config has settings for unknown provider '{}' (known: {})",
                    id,
                    known.join(", ")
                );
            }
        }

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Registry providers with user overrides applied; disabled ones are dropped
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        list_providers()
            .into_iter()
            .filter_map(|p| match self.providers.get(&p.provider_id) {
                Some(ov) => p.apply_override(ov),
                None => Some(p),
            })
            .collect()
    }

    fn base_url(&self, provider_id: &str) -> Option<String> {
        self.providers
            .get(provider_id)
            .and_then(|ov| ov.base_url.clone())
    }

    /// Build the completion backends for `available`, reading each credential through `lookup`
    pub fn build_router<F>(
        &self,
        available: &[ProviderDescriptor],
        lookup: F,
        client: reqwest::Client,
    ) -> Result<ProviderRouter>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut router = ProviderRouter::new();
        for descriptor in available {
            let api_key = descriptor.credential_with(&lookup).with_context(|| {
                format!(
                    "{} is not set for {}",
                    descriptor.credential_var, descriptor.display_name
                )
            })?;
            let id = descriptor.provider_id.as_str();
            let base_url = self.base_url(id);
            let backend: Box<dyn LlmProvider> = match descriptor.backend {
                Backend::Anthropic => Box::new(AnthropicProvider::new(
                    client.clone(),
                    api_key,
                    base_url.unwrap_or_else(|| anthropic::DEFAULT_BASE_URL.to_string()),
                )),
                Backend::Gemini => Box::new(GoogleProvider::new(
                    client.clone(),
                    api_key,
                    base_url.unwrap_or_else(|| google::DEFAULT_BASE_URL.to_string()),
                )),
                Backend::OpenAi => Box::new(OpenAiProvider::new(
                    client.clone(),
                    api_key,
                    base_url.unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
                )),
                Backend::Xai => Box::new(OpenAiCompatProvider::new(
                    client.clone(),
                    id.to_string(),
                    api_key,
                    base_url.unwrap_or_else(|| openai_compat::XAI_BASE_URL.to_string()),
                )),
            };
            debug!("Configured backend {:?}", id);
            router.register(backend);
        }
        Ok(router)
    }

    /// Where the session file lives: config override, else the per-user cache directory
    pub fn session_path<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.session.path {
            return path.clone();
        }
        default_session_path(
            lookup,
            cfg!(windows),
            dirs::home_dir(),
            dirs::data_local_dir(),
        )
    }
}

/// Resolve `<cache root>/multichat/session.json`.
///
/// Cache root: `XDG_CACHE_HOME` if set; on Windows then `LOCALAPPDATA` or the
/// platform local-data directory; otherwise `~/.cache`.
pub fn default_session_path<F>(
    lookup: F,
    windows: bool,
    home: Option<PathBuf>,
    local_data: Option<PathBuf>,
) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
    let home = home.unwrap_or_else(|| PathBuf::from("."));

    let root = if let Some(dir) = non_empty(CACHE_HOME_ENV) {
        dir
    } else if windows {
        non_empty(LOCAL_APP_DATA_ENV)
            .or(local_data)
            .unwrap_or_else(|| home.join("AppData").join("Local"))
    } else {
        home.join(".cache")
    };

    root.join(SESSION_SUBDIR).join(SESSION_FILE)
}

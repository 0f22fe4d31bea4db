//! # Configuration
//!
//! Settings live in `~/.sage_config.json` and can be overridden by
//! environment variables (`SAGE_PROVIDER`, `SAGE_MODEL`, and the
//! per-provider API key variables). Environment always wins over the
//! file, so a one-off `SAGE_PROVIDER=openai sage run ...` works without
//! touching the saved configuration.

use std::path::PathBuf;
use std::time::Duration;

use sage_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

use crate::provider::{ProviderConfig, ProviderType};

const CONFIG_FILE_NAME: &str = ".sage_config.json";

/// How long to wait for a local Ollama server before declaring it down
const OLLAMA_PROBE_TIMEOUT_SECS: u64 = 2;

/// Persisted settings. Field names double as the environment variable
/// names so the file stays self-describing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "SAGE_PROVIDER", default)]
    pub provider: Option<String>,
    #[serde(rename = "SAGE_MODEL", default)]
    pub model: Option<String>,
    #[serde(rename = "GOOGLE_API_KEY", default)]
    pub google_api_key: Option<String>,
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub openai_api_key: Option<String>,
    #[serde(rename = "ANTHROPIC_API_KEY", default)]
    pub anthropic_api_key: Option<String>,
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Default config file location in the user's home directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Load from the default path, then apply environment overrides.
    /// A missing or unreadable file yields empty settings rather than
    /// an error so first runs can fall through to the setup wizard.
    pub fn load() -> Settings {
        Self::load_from(&Settings::default_path())
    }

    pub fn load_from(path: &std::path::Path) -> Settings {
        let mut settings = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str::<Settings>(&text).ok())
            .unwrap_or_default();
        settings.apply_env();
        settings
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SAGE_PROVIDER") {
            self.provider = nonempty(Some(v)).or(self.provider.take());
        }
        if let Ok(v) = std::env::var("SAGE_MODEL") {
            self.model = nonempty(Some(v)).or(self.model.take());
        }
        if let Ok(v) = std::env::var("GOOGLE_API_KEY") {
            self.google_api_key = nonempty(Some(v)).or(self.google_api_key.take());
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = nonempty(Some(v)).or(self.openai_api_key.take());
        }
        if let Ok(v) = std::env::var("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = nonempty(Some(v)).or(self.anthropic_api_key.take());
        }
    }

    /// Persist to the default path as pretty-printed JSON
    pub fn save(&self) -> Result<()> {
        self.save_to(&Settings::default_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::new(ErrorKind::SerializationFailed, "failed to serialize settings")
                .with_operation("Settings::save")
                .set_source(e)
        })?;
        std::fs::write(path, json).map_err(|e| {
            Error::from(e)
                .with_operation("Settings::save")
                .with_context("path", path.display().to_string())
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or("ollama")
    }

    /// Check whether the configured provider is usable: cloud providers
    /// need their API key, Ollama needs a responding local server. An
    /// unset provider is never configured, so first runs get the setup
    /// wizard even when a local Ollama server happens to be up.
    pub async fn is_configured(&self) -> bool {
        let Some(provider) = self.provider.as_deref() else {
            return false;
        };
        match provider {
            "google" => self.google_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            "anthropic" => self.anthropic_api_key.is_some(),
            "ollama" => ollama_is_running().await,
            _ => false,
        }
    }

    /// Build the provider configuration for the selected backend
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let config = match self.provider_name() {
            "openai" => {
                let key = self.openai_api_key.clone().ok_or_else(|| {
                    Error::config_invalid("OPENAI_API_KEY not set")
                        .with_operation("Settings::provider_config")
                })?;
                ProviderConfig::openai(key)
            }
            "anthropic" => {
                let key = self.anthropic_api_key.clone().ok_or_else(|| {
                    Error::config_invalid("ANTHROPIC_API_KEY not set")
                        .with_operation("Settings::provider_config")
                })?;
                ProviderConfig::anthropic(key)
            }
            "google" => {
                let key = self.google_api_key.clone().ok_or_else(|| {
                    Error::config_invalid("GOOGLE_API_KEY not set")
                        .with_operation("Settings::provider_config")
                })?;
                ProviderConfig::google(key)
            }
            "ollama" => ProviderConfig::ollama(),
            other => {
                return Err(Error::config_invalid(format!("unknown provider: {}", other))
                    .with_operation("Settings::provider_config"))
            }
        };

        Ok(match &self.model {
            Some(model) if !model.is_empty() => config.with_model(model.clone()),
            _ => config,
        })
    }

    /// The model that will actually be used, after defaults
    pub fn effective_model(&self) -> Option<String> {
        if let Some(model) = nonempty(self.model.clone()) {
            return Some(model);
        }
        let default = match self.provider_name() {
            "openai" => "gpt-4o-mini",
            "anthropic" => "claude-3-5-sonnet-20241022",
            "google" => "gemini-1.5-flash",
            "ollama" => "llama3.2:latest",
            _ => return None,
        };
        Some(default.to_string())
    }

    pub fn provider_type(&self) -> Option<ProviderType> {
        match self.provider_name() {
            "openai" => Some(ProviderType::OpenAI),
            "anthropic" => Some(ProviderType::Anthropic),
            "google" => Some(ProviderType::Google),
            "ollama" => Some(ProviderType::Ollama),
            _ => None,
        }
    }
}

/// Probe the local Ollama server's tag listing endpoint
pub async fn ollama_is_running() -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(OLLAMA_PROBE_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.get("http://localhost:11434/api/tags").send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

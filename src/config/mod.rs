use crate::eval::HarnessSettings;
use crate::provider::ModelPricing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default deadline for each remote call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inference: InferenceConfig,
    pub compression: CompressionConfig,
    /// Harness defaults; CLI flags override these.
    pub eval: HarnessSettings,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: String,
    pub model: String,
    /// Falls back to the environment when unset.
    pub api_key: Option<String>,
    /// USD per million tokens. Ignored when the provider reports cost.
    pub pricing: ModelPricing,
    pub timeout_secs: u64,
    /// Refuse calls that could push total spend past this many USD.
    pub budget_usd: Option<f64>,
}

impl InferenceConfig {
    pub const API_KEY_ENV_VARS: &'static [&'static str] =
        &["SQUEEZE_INFERENCE_API_KEY", "OPENAI_API_KEY"];

    /// Configured key, or the first non-empty environment variable.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_ref(), Self::API_KEY_ENV_VARS)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Local endpoints (Ollama, llama.cpp, vLLM on loopback) run without a key.
    #[must_use]
    pub fn is_local(&self) -> bool {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            pricing: ModelPricing {
                input: 0.15,
                output: 0.60,
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            budget_usd: None,
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("pricing", &self.pricing)
            .field("timeout_secs", &self.timeout_secs)
            .field("budget_usd", &self.budget_usd)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Service base URL; requests go to `{base_url}/compress`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl CompressionConfig {
    pub const API_KEY_ENV_VARS: &'static [&'static str] = &["SQUEEZE_COMPRESSION_API_KEY"];

    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_ref(), Self::API_KEY_ENV_VARS)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for CompressionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn resolve_key(configured: Option<&String>, env_vars: &[&str]) -> Option<String> {
    configured
        .filter(|key| !key.is_empty())
        .cloned()
        .or_else(|| {
            env_vars
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|value| !value.is_empty())
        })
}

impl Config {
    /// Default config file location.
    #[must_use]
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("squeeze").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".squeeze/config.toml"))
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

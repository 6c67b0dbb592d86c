//! Configuration loading and backend factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mcqbias_core::traits::Generator;

use crate::mock::MockGenerator;
use crate::ollama::{OllamaGenerator, DEFAULT_BASE_URL};
use crate::openai::OpenAiGenerator;
use crate::retry::RetryingGenerator;

/// Local config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "mcqbias.toml";

/// Configuration for a single backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    Mock {
        #[serde(default)]
        response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response } => {
                f.debug_struct("Mock").field("response", response).finish()
            }
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Top-level mcqbias configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqBiasConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Backend used when a model is given without a `provider/` prefix.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Max concurrent generation requests.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Per-question generation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Root of the dataset tree (`dev/`, `test/`, `val/`).
    #[serde(default = "default_datasets_path")]
    pub datasets_path: PathBuf,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Seed for sampling and debiasing; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_parallelism() -> usize {
    4
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    300
}
fn default_datasets_path() -> PathBuf {
    PathBuf::from(".build/datasets/mmlu")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./mcqbias-results")
}

impl Default for McqBiasConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            parallelism: default_parallelism(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            timeout_secs: default_timeout(),
            datasets_path: default_datasets_path(),
            output_dir: default_output_dir(),
            seed: None,
        }
    }
}

impl McqBiasConfig {
    /// Look up a backend by name.
    ///
    /// `ollama` and `mock` work without an explicit entry.
    pub fn provider(&self, name: &str) -> Result<ProviderConfig> {
        if let Some(config) = self.providers.get(name) {
            return Ok(config.clone());
        }
        match name {
            "ollama" => Ok(ProviderConfig::Ollama {
                base_url: default_ollama_url(),
            }),
            "mock" => Ok(ProviderConfig::Mock { response: None }),
            _ => anyhow::bail!(
                "provider '{name}' is not configured. Add a [providers.{name}] section to {CONFIG_FILE_NAME}"
            ),
        }
    }

    /// Split `provider/model` into its parts, falling back to the default
    /// provider when there is no prefix.
    ///
    /// Only the first `/` separates, so `ollama/library/phi3` keeps the
    /// model `library/phi3`.
    pub fn resolve_model<'a>(&'a self, qualified: &'a str) -> (&'a str, &'a str) {
        match qualified.split_once('/') {
            Some((provider, model))
                if self.providers.contains_key(provider)
                    || matches!(provider, "ollama" | "openai" | "mock") =>
            {
                (provider, model)
            }
            _ => (self.default_provider.as_str(), qualified),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::Mock { response } => ProviderConfig::Mock {
            response: response.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mcqbias.toml` in the current directory
/// 2. `~/.config/mcqbias/config.toml`
///
/// Environment variable overrides: `MCQBIAS_OPENAI_KEY`, `MCQBIAS_OLLAMA_URL`.
pub fn load_config() -> Result<McqBiasConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<McqBiasConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<McqBiasConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => McqBiasConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn apply_env_overrides(config: &mut McqBiasConfig) {
    if let Ok(key) = std::env::var("MCQBIAS_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(url) = std::env::var("MCQBIAS_OLLAMA_URL") {
        let entry = config
            .providers
            .entry("ollama".into())
            .or_insert(ProviderConfig::Ollama {
                base_url: String::new(),
            });
        if let ProviderConfig::Ollama { base_url } = entry {
            *base_url = url;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mcqbias"))
}

/// Create a backend instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Generator>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("OpenAI API key is empty. Set MCQBIAS_OPENAI_KEY or api_key in {CONFIG_FILE_NAME}");
            }
            Ok(Box::new(OpenAiGenerator::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?))
        }
        ProviderConfig::Ollama { base_url } => Ok(Box::new(OllamaGenerator::new(base_url)?)),
        ProviderConfig::Mock { response } => Ok(Box::new(match response {
            Some(text) => MockGenerator::with_fixed_response(text),
            None => MockGenerator::new(Vec::new()),
        })),
    }
}

/// Create a named backend wrapped with the configured retry policy.
pub fn create_generator(name: &str, config: &McqBiasConfig) -> Result<Arc<dyn Generator>> {
    let provider = create_provider(&config.provider(name)?)
        .with_context(|| format!("failed to create provider '{name}'"))?;
    Ok(Arc::new(RetryingGenerator::new(
        Arc::from(provider),
        config.max_retries,
        Duration::from_millis(config.retry_delay_ms),
    )))
}

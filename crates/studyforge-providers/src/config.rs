//! Configuration file loading and generator factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use studyforge_core::config::ScoringConfig;
use studyforge_core::generation::AdapterConfig;
use studyforge_core::traits::TextGenerator;

use crate::ollama::OllamaGenerator;
use crate::openai::OpenAiGenerator;

/// Configuration for a single text-generation backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
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
        }
    }
}

fn default_ollama_url() -> String {
    crate::ollama::DEFAULT_BASE_URL.to_string()
}

/// Top-level studyforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyforgeConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Backend used when none is named.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model passed to the backend.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Sampling temperature for generated content.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Max tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Deadline for a single generator call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Attempts per generation request (first try included).
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Where scores, quizzes and gradings are stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Marking and scoring constants.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3.2".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_timeout() -> u64 {
    crate::ollama::DEFAULT_TIMEOUT_SECS
}
fn default_attempts() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./studyforge-data")
}

impl Default for StudyforgeConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
            retry_delay_ms: default_retry_delay(),
            data_dir: default_data_dir(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl StudyforgeConfig {
    /// Check value ranges that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=2.0).contains(&self.temperature),
            "temperature must be between 0.0 and 2.0, got {}",
            self.temperature
        );
        ensure!(self.max_tokens > 0, "max_tokens must be positive");
        ensure!(self.timeout_secs > 0, "timeout_secs must be positive");
        ensure!(
            (1..=10).contains(&self.max_attempts),
            "max_attempts must be between 1 and 10, got {}",
            self.max_attempts
        );
        self.scoring.validate().context("invalid [scoring] section")?;
        Ok(())
    }

    /// Generation adapter settings derived from this configuration.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            words: self.scoring.words,
        }
    }

    /// The configuration for `name`. The default Ollama backend is always
    /// available even when not listed.
    pub fn provider(&self, name: &str) -> Result<ProviderConfig> {
        if let Some(config) = self.providers.get(name) {
            return Ok(config.clone());
        }
        if name == "ollama" {
            return Ok(ProviderConfig::Ollama {
                base_url: default_ollama_url(),
            });
        }
        let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        known.sort_unstable();
        bail!(
            "provider '{name}' is not configured (configured: {})",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        )
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

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `studyforge.toml` in the current directory
/// 2. `~/.config/studyforge/config.toml`
///
/// Environment variable overrides: `STUDYFORGE_OPENAI_KEY`, `STUDYFORGE_OLLAMA_URL`.
pub fn load_config() -> Result<StudyforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("studyforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config(path)?,
        None => StudyforgeConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    config.validate().with_context(|| match &config_path {
        Some(path) => format!("invalid config: {}", path.display()),
        None => "invalid default config".to_string(),
    })?;

    tracing::debug!(path = ?config_path, provider = %config.default_provider, "configuration loaded");
    Ok(config)
}

fn parse_config(path: &Path) -> Result<StudyforgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<StudyforgeConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn apply_env_overrides(config: &mut StudyforgeConfig) {
    if let Ok(key) = std::env::var("STUDYFORGE_OPENAI_KEY") {
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

    if let Ok(url) = std::env::var("STUDYFORGE_OLLAMA_URL") {
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
        .map(|h| PathBuf::from(h).join(".config").join("studyforge"))
}

/// Create a generator instance from its configuration.
pub fn create_generator(config: &ProviderConfig, timeout_secs: u64) -> Result<Arc<dyn TextGenerator>> {
    match config {
        ProviderConfig::Ollama { base_url } => {
            Ok(Arc::new(OllamaGenerator::new(base_url, timeout_secs)?))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            ensure!(
                !api_key.is_empty(),
                "openai provider needs an api_key (or set STUDYFORGE_OPENAI_KEY)"
            );
            Ok(Arc::new(OpenAiGenerator::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
                timeout_secs,
            )?))
        }
    }
}

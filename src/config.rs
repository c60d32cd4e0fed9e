//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `./stancelab.toml` (working directory)
//! 3. `~/.stancelab/config.toml` (user)
//!
//! When no file is found the built-in defaults are used. Every section and
//! field is optional. `OLLAMA_HOST` overrides `service.base_url`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::predictor::regression::TrainingConfig;
use crate::providers::retry::RetryConfig;
use crate::types::{BinScheme, GenerateOptions};
use crate::{Result, StanceError};

/// Environment variable overriding the generative service URL.
pub const BASE_URL_ENV: &str = "OLLAMA_HOST";

/// Top-level configuration passed into each component.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub bins: BinScheme,
    #[serde(default)]
    pub exemplars: ExemplarConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Generative service endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL (default: http://localhost:11434).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name (default: mistral:latest).
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-call timeout in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "mistral:latest".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Generation parameters sent with every call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature (default: 0.0).
    #[serde(default)]
    pub temperature: f32,
    /// Maximum reply tokens (default: unset).
    #[serde(default)]
    pub max_tokens: Option<usize>,
    /// Context window in tokens (default: 4096).
    #[serde(default = "default_num_ctx")]
    pub num_ctx: usize,
    /// Tokens reserved for the reply when budgeting the prompt (default: 96).
    #[serde(default = "default_reply_headroom")]
    pub reply_headroom: usize,
    /// Generation seed (default: unset).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            num_ctx: default_num_ctx(),
            reply_headroom: default_reply_headroom(),
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Token budget available to the prompt.
    pub fn prompt_budget(&self) -> usize {
        self.num_ctx.saturating_sub(self.reply_headroom)
    }

    /// Build call options for `model`.
    pub fn options(&self, model: impl Into<String>) -> GenerateOptions {
        let mut options = GenerateOptions::new(model)
            .temperature(self.temperature)
            .num_ctx(self.num_ctx);
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        if let Some(seed) = self.seed {
            options = options.seed(seed);
        }
        options
    }
}

fn default_num_ctx() -> usize {
    4096
}

fn default_reply_headroom() -> usize {
    96
}

/// Retry policy for outbound calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 500).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap on the backoff delay in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Randomize delays (default: true).
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new()
            .max_attempts(settings.max_attempts)
            .initial_delay(Duration::from_millis(settings.initial_delay_ms))
            .max_delay(Duration::from_millis(settings.max_delay_ms))
            .jitter(settings.jitter)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

/// Few-shot exemplar selection.
#[derive(Debug, Clone, Deserialize)]
pub struct ExemplarConfig {
    /// Seed for the selection shuffle (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ExemplarConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Batch execution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Documents in flight at once (default: 1).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pause after each document in milliseconds (default: 0).
    #[serde(default)]
    pub pause_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            pause_ms: 0,
        }
    }
}

fn default_concurrency() -> usize {
    1
}

impl Config {
    /// Load configuration from the standard locations, falling back to defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        if let Ok(host) = std::env::var(BASE_URL_ENV) {
            if !host.trim().is_empty() {
                config.service.base_url = host_to_url(host.trim());
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StanceError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            StanceError::Configuration(msg) => {
                StanceError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            StanceError::Configuration(format!("Failed to parse config: {e}"))
        })
    }

    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<()> {
        self.bins.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(StanceError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(StanceError::Configuration(
                "service.timeout_secs must be positive".into(),
            ));
        }
        if self.run.concurrency == 0 {
            return Err(StanceError::Configuration(
                "run.concurrency must be at least 1".into(),
            ));
        }
        self.training.validate()
    }

    /// Retry policy derived from the `[retry]` section.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(StanceError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        let local = PathBuf::from("stancelab.toml");
        if local.exists() {
            return Ok(Some(local));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".stancelab").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}

/// `OLLAMA_HOST` may omit the scheme (`0.0.0.0:11434`).
fn host_to_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

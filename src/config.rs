//! Configuration loaded from `mediaflow.toml`.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. `OPENAI_API_KEY` and `GEMINI_API_KEY` take precedence over
//! keys written in the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::error::MediaflowError;
use crate::provider::RetryPolicy;
use crate::state_machine::TransitionPolicy;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "mediaflow.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaflowConfig {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

/// Which vendor formats prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Simulated,
    #[serde(alias = "chatgpt")]
    OpenAi,
    #[default]
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Upper bound for one prompt formatting call, retries included.
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,
}

fn default_prompt_timeout_secs() -> u64 {
    60
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_openai_model(),
            max_tokens: default_openai_max_tokens(),
            temperature: default_temperature(),
            base_url: default_openai_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_gemini_max_output_tokens() -> u32 {
    8192
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            max_output_tokens: default_gemini_max_output_tokens(),
            temperature: default_temperature(),
            base_url: default_gemini_base_url(),
        }
    }
}

/// Backoff applied by vendor clients to rate-limited calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms)),
        }
    }
}

/// Bounds of the simulated generation stage.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_generation_delay_ms")]
    pub max_delay_ms: u64,
    /// Probability in `[0, 1]` that a simulated generation succeeds.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_min_delay_ms() -> u64 {
    5000
}

fn default_max_generation_delay_ms() -> u64 {
    15_000
}

fn default_success_rate() -> f64 {
    0.5
}

fn default_output_dir() -> String {
    "/simulated/output".to_string()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_generation_delay_ms(),
            success_rate: default_success_rate(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Requests generated at the same time. `1` keeps the batch sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleSettings {
    /// Allow `format` directly from FAIL.
    #[serde(default)]
    pub retry_from_fail: bool,
}

impl LifecycleSettings {
    pub fn policy(&self) -> TransitionPolicy {
        if self.retry_from_fail {
            TransitionPolicy::with_fail_retry()
        } else {
            TransitionPolicy::strict()
        }
    }
}

/// Where request records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    /// Records are dropped when the process exits.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "mediaflow-requests.json".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_store_path(),
        }
    }
}

impl MediaflowConfig {
    /// Loads `mediaflow.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_or_default(Path::new(CONFIG_FILE))
    }

    /// Loads the config at `path`. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("config file {} not found", path.display());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<MediaflowConfig>(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        config.finish()
    }

    fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Self::default().finish()
        }
    }

    /// Applies environment overrides and validates.
    fn finish(mut self) -> Result<Self> {
        // Environment variables take precedence over the file for API keys.
        if let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            self.openai.api_key = key;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            self.gemini.api_key = key;
        }

        self.validate()?;
        Ok(self)
    }

    /// Rejects values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), MediaflowError> {
        if self.provider.prompt_timeout_secs == 0 {
            return Err(MediaflowError::Config(
                "provider.prompt_timeout_secs must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.generation.success_rate) {
            return Err(MediaflowError::Config(format!(
                "generation.success_rate must be within [0, 1], got {}",
                self.generation.success_rate
            )));
        }
        if self.generation.min_delay_ms > self.generation.max_delay_ms {
            return Err(MediaflowError::Config(format!(
                "generation.min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.generation.min_delay_ms, self.generation.max_delay_ms
            )));
        }
        if self.store.kind == StoreKind::Json && self.store.path.trim().is_empty() {
            return Err(MediaflowError::Config("store.path must not be empty".into()));
        }
        Ok(())
    }
}

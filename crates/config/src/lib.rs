//! Configuration loading, validation, and management for Lectern.
//!
//! Loads configuration from `~/.lectern/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use lectern_core::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.lectern/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Providers tried, in order, after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Context bounding limits
    #[serde(default)]
    pub bounding: BoundingConfig,

    /// Relevance scoring constants
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Retry policy for generation calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Generation defaults
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Failure notifications
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("fallback_providers", &self.fallback_providers)
            .field("bounding", &self.bounding)
            .field("scoring", &self.scoring)
            .field("retry", &self.retry)
            .field("generation", &self.generation)
            .field("notifications", &self.notifications)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Limits for reducing large source text to a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingConfig {
    /// Text estimated at or below this many tokens passes through untouched.
    #[serde(default = "default_threshold_tokens")]
    pub threshold_tokens: usize,

    /// Hard ceiling on the bounded output.
    #[serde(default = "default_output_ceiling_tokens")]
    pub output_ceiling_tokens: usize,

    #[serde(default = "default_chunk_size_tokens")]
    pub chunk_size_tokens: usize,

    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,

    /// Last-resort substring length when every other strategy failed.
    #[serde(default = "default_emergency_chars")]
    pub emergency_chars: usize,
}

fn default_threshold_tokens() -> usize {
    2000
}
fn default_output_ceiling_tokens() -> usize {
    3000
}
fn default_chunk_size_tokens() -> usize {
    1000
}
fn default_overlap_tokens() -> usize {
    100
}
fn default_emergency_chars() -> usize {
    12_000
}

impl Default for BoundingConfig {
    fn default() -> Self {
        Self {
            threshold_tokens: default_threshold_tokens(),
            output_ceiling_tokens: default_output_ceiling_tokens(),
            chunk_size_tokens: default_chunk_size_tokens(),
            overlap_tokens: default_overlap_tokens(),
            emergency_chars: default_emergency_chars(),
        }
    }
}

/// Constants of the lexical relevance heuristic.
///
/// The defaults are empirical and kept for behavioural parity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    #[serde(default = "default_length_weight")]
    pub length_weight: f64,

    /// Multiplier applied to raw keyword density before capping at 1.0.
    #[serde(default = "default_density_amplification")]
    pub density_amplification: f64,

    #[serde(default = "default_ideal_length_chars")]
    pub ideal_length_chars: usize,

    // Used when a task type has no keyword table.
    #[serde(default = "default_general_ideal_length_chars")]
    pub general_ideal_length_chars: usize,

    #[serde(default = "default_general_length_weight")]
    pub general_length_weight: f64,

    #[serde(default = "default_general_sentence_weight")]
    pub general_sentence_weight: f64,

    /// Sentence count at which the sentence score saturates.
    #[serde(default = "default_sentence_saturation")]
    pub sentence_saturation: usize,
}

fn default_keyword_weight() -> f64 {
    0.7
}
fn default_length_weight() -> f64 {
    0.3
}
fn default_density_amplification() -> f64 {
    10.0
}
fn default_ideal_length_chars() -> usize {
    2000
}
fn default_general_ideal_length_chars() -> usize {
    1500
}
fn default_general_length_weight() -> f64 {
    0.6
}
fn default_general_sentence_weight() -> f64 {
    0.4
}
fn default_sentence_saturation() -> usize {
    10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            length_weight: default_length_weight(),
            density_amplification: default_density_amplification(),
            ideal_length_chars: default_ideal_length_chars(),
            general_ideal_length_chars: default_general_ideal_length_chars(),
            general_length_weight: default_general_length_weight(),
            general_sentence_weight: default_general_sentence_weight(),
            sentence_saturation: default_sentence_saturation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per generation call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_item_count")]
    pub flashcard_count: usize,

    #[serde(default = "default_item_count")]
    pub quiz_count: usize,

    /// Task types the pipeline runs for each unit.
    #[serde(default = "default_enabled_tasks")]
    pub enabled_tasks: Vec<TaskType>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_item_count() -> usize {
    15
}
fn default_enabled_tasks() -> Vec<TaskType> {
    TaskType::ALL.to_vec()
}

impl GenerationConfig {
    /// Requested item count for a collection task, if it is one.
    pub fn item_count(&self, task: TaskType) -> Option<usize> {
        match task {
            TaskType::Flashcard => Some(self.flashcard_count),
            TaskType::Quiz => Some(self.quiz_count),
            _ => None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            flashcard_count: default_item_count(),
            quiz_count: default_item_count(),
            enabled_tasks: default_enabled_tasks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Per-request timeout when this provider sits in the fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lectern/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `LECTERN_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_path())
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Fill the API key from the environment when the file has none, and
    /// let `LECTERN_PROVIDER` / `LECTERN_MODEL` override the defaults.
    pub fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = ["LECTERN_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        }

        if let Ok(provider) = std::env::var("LECTERN_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("LECTERN_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lectern")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        if g.temperature < 0.0 || g.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        let b = &self.bounding;
        if b.output_ceiling_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "bounding.output_ceiling_tokens must be > 0".into(),
            ));
        }
        if b.threshold_tokens > b.output_ceiling_tokens {
            return Err(ConfigError::ValidationError(
                "bounding.threshold_tokens must not exceed output_ceiling_tokens".into(),
            ));
        }
        if b.chunk_size_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "bounding.chunk_size_tokens must be > 0".into(),
            ));
        }
        if b.overlap_tokens >= b.chunk_size_tokens {
            return Err(ConfigError::ValidationError(
                "bounding.overlap_tokens must be smaller than chunk_size_tokens".into(),
            ));
        }

        if self.fallback_providers.contains(&self.default_provider) {
            return Err(ConfigError::ValidationError(
                "fallback_providers must not repeat default_provider".into(),
            ));
        }
        if self.providers.values().any(|p| p.timeout_secs == Some(0)) {
            return Err(ConfigError::ValidationError(
                "providers.*.timeout_secs must be > 0".into(),
            ));
        }

        let s = &self.scoring;
        if s.keyword_weight + s.length_weight <= 0.0 {
            return Err(ConfigError::ValidationError(
                "scoring.keyword_weight + scoring.length_weight must be > 0".into(),
            ));
        }
        if s.general_length_weight + s.general_sentence_weight <= 0.0 {
            return Err(ConfigError::ValidationError(
                "scoring.general_length_weight + scoring.general_sentence_weight must be > 0"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            fallback_providers: Vec::new(),
            bounding: BoundingConfig::default(),
            scoring: ScoringConfig::default(),
            retry: RetryConfig::default(),
            generation: GenerationConfig::default(),
            notifications: NotificationConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

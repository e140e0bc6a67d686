use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration module
/// This module handles loading, validating and defaulting the settings the
/// worker pool runs with. Everything here can be overridden from the CLI.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry and throttle policy
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Output acceptance settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Credential sources
    #[serde(default)]
    pub keys: KeysConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Remote generation API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    // @field: Base URL, model path is appended per request
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Model every job starts on
    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    // @field: Model used after a non-quota HTTP error
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    // @field: Request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Sampling temperature
    #[serde(default)]
    pub temperature: f32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry budget and fixed delays used by every worker
///
/// All budgets count calls, not extra retries: with `max_attempts = 3` a job
/// that keeps failing the same way is sent exactly three times.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Calls allowed per failure class before escalating
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after an empty, untranslated, HTTP or network failure
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after an HTTP 429
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Self-throttle after each successfully written job
    #[serde(default = "default_job_delay_ms")]
    pub job_delay_ms: u64,

    /// Self-throttle after each fixed line in the line-fix tasks
    #[serde(default = "default_line_delay_ms")]
    pub line_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            job_delay_ms: default_job_delay_ms(),
            line_delay_ms: default_line_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default budget and no pauses at all
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            rate_limit_delay_ms: 0,
            job_delay_ms: 0,
            line_delay_ms: 0,
            ..Default::default()
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn job_delay(&self) -> Duration {
        Duration::from_millis(self.job_delay_ms)
    }

    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }
}

/// Output acceptance settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityConfig {
    /// CJK code points at or above which a translation counts as incomplete
    #[serde(default = "default_cjk_threshold")]
    pub cjk_threshold: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            cjk_threshold: default_cjk_threshold(),
        }
    }
}

/// Where API keys come from
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeysConfig {
    /// Newline-delimited key file
    #[serde(default = "default_keys_file")]
    pub keys_file: Option<PathBuf>,

    /// Environment variable holding a comma-delimited key list
    #[serde(default = "default_keys_env")]
    pub keys_env: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            keys_file: default_keys_file(),
            keys_env: default_keys_env(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_primary_model() -> String {
    "gemma-3-27b-it".to_string()
}

fn default_fallback_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    10_000
}

fn default_rate_limit_delay_ms() -> u64 {
    20_000
}

fn default_job_delay_ms() -> u64 {
    8_000
}

fn default_line_delay_ms() -> u64 {
    5_000
}

fn default_cjk_threshold() -> usize {
    4
}

fn default_keys_file() -> Option<PathBuf> {
    Some(PathBuf::from("auth_files/keys.txt"))
}

fn default_keys_env() -> String {
    "GOOGLE_API_KEYS".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.api.primary_model.trim().is_empty() || self.api.fallback_model.trim().is_empty() {
            return Err(anyhow!("Both primary and fallback model ids are required"));
        }

        if self.api.primary_model == self.api.fallback_model {
            return Err(anyhow!(
                "Fallback model must differ from the primary model ({})",
                self.api.primary_model
            ));
        }

        if self.api.endpoint.trim().is_empty() {
            return Err(anyhow!("API endpoint must not be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }

        if self.quality.cjk_threshold == 0 {
            return Err(anyhow!("quality.cjk_threshold must be at least 1"));
        }

        Ok(())
    }
}

//! Configuration management for the prediction service

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub explanation: ExplanationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Persisted model artifacts configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the persisted model artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    /// Fallback primary model when no comparison metadata designates one
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
}

/// Explanation gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationConfig {
    /// API credential. Absent credential disables the capability entirely.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base endpoint of the generative-AI service
    #[serde(default = "default_explanation_endpoint")]
    pub endpoint: String,
    /// Generative model identifier
    #[serde(default = "default_explanation_model")]
    pub model: String,
    /// Per-attempt request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Fixed backoff before the single retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_models_dir() -> String {
    "saved_models".to_string()
}

fn default_primary_model() -> String {
    "logistic_regression".to_string()
}

fn default_explanation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_explanation_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl AppConfig {
    /// Load configuration from the default path, overlaying environment
    /// variables (`WINEQ__EXPLANATION__API_KEY` style) and the
    /// `GEMINI_API_KEY` credential variable.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path. A missing file yields the
    /// built-in defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("WINEQ").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // The credential also resolves from the conventional variable.
        if app_config.explanation.api_key.is_none() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                if !key.is_empty() {
                    app_config.explanation.api_key = Some(key);
                }
            }
        }

        Ok(app_config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            explanation: ExplanationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            primary_model: default_primary_model(),
        }
    }
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_explanation_endpoint(),
            model: default_explanation_model(),
            timeout_ms: default_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

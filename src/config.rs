//! Configuration management for the travel planner
//!
//! Handles loading configuration from files, `.env`, and environment variables,
//! and provides validation for all configuration settings. The resulting
//! [`PlannerConfig`] is built once at startup and handed to the components
//! that need it.

use crate::PlannerError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding an explicit config file path
pub const CONFIG_PATH_ENV: &str = "TRAVELPLANNER_CONFIG";

/// Conventional Gemini key variable, used when no key is configured otherwise
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Root configuration structure for the travel planner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Planning behaviour
    pub planner: PlanningConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// LLM (Gemini) configuration settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gemini API key
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Lower bound of the exponential backoff in milliseconds
    pub retry_min_backoff_ms: u64,
    /// Upper bound of the exponential backoff in milliseconds
    pub retry_max_backoff_ms: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("retry_min_backoff_ms", &self.retry_min_backoff_ms)
            .field("retry_max_backoff_ms", &self.retry_max_backoff_ms)
            .finish()
    }
}

/// Planning behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Deadline for producing a whole plan, in seconds
    pub request_timeout_seconds: u32,
    /// Longest trip accepted, in days
    pub max_duration_days: u32,
    /// Currency the budget and all estimates are expressed in
    pub currency: String,
    /// Number of hotel options to ask for
    pub hotel_count: u32,
    /// Number of places to ask for
    pub place_count: u32,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: String,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
    /// PEM certificate path, enables TLS together with `tls_key_path`
    pub tls_cert_path: Option<String>,
    /// PEM private key path
    pub tls_key_path: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_llm_timeout() -> u32 {
    60
}

fn default_llm_max_retries() -> u32 {
    2
}

fn default_request_timeout() -> u32 {
    120
}

fn default_max_duration_days() -> u32 {
    60
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            temperature: 0.3,
            timeout_seconds: default_llm_timeout(),
            max_retries: default_llm_max_retries(),
            retry_min_backoff_ms: 500,
            retry_max_backoff_ms: 10_000,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            max_duration_days: default_max_duration_days(),
            currency: default_currency(),
            hotel_count: 2,
            place_count: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: default_server_port(),
            static_dir: "static".to_string(),
            max_body_bytes: 64 * 1024,
            tls_cert_path: None,
            tls_key_path: None,
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

impl LlmConfig {
    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl PlanningConfig {
    /// Deadline for a whole plan
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.into())
    }
}

impl PlannerConfig {
    /// Load configuration from `.env`, the config file and environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            tracing::debug!("Reading configuration from {}", config_file.display());
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. TRAVELPLANNER__LLM__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("TRAVELPLANNER")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var(GOOGLE_API_KEY_ENV).ok();
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelplanner").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.llm.model.is_empty() {
            self.llm.model = default_llm_model();
        }
        if self.llm.base_url.is_empty() {
            self.llm.base_url = default_llm_base_url();
        }
        if self.llm.timeout_seconds == 0 {
            self.llm.timeout_seconds = default_llm_timeout();
        }
        if self.planner.request_timeout_seconds == 0 {
            self.planner.request_timeout_seconds = default_request_timeout();
        }
        if self.planner.max_duration_days == 0 {
            self.planner.max_duration_days = default_max_duration_days();
        }
        if self.planner.currency.is_empty() {
            self.planner.currency = default_currency();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if matches!(self.llm.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            self.llm.api_key = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.llm.timeout_seconds > 600 {
            return Err(PlannerError::config("LLM timeout cannot exceed 600 seconds").into());
        }

        if self.llm.max_retries > 10 {
            return Err(PlannerError::config("LLM max retries cannot exceed 10").into());
        }

        if self.llm.retry_min_backoff_ms > self.llm.retry_max_backoff_ms {
            return Err(PlannerError::config(
                "LLM retry_min_backoff_ms cannot exceed retry_max_backoff_ms",
            )
            .into());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PlannerError::config("LLM temperature must be between 0.0 and 2.0").into());
        }

        if self.planner.request_timeout_seconds > 900 {
            return Err(PlannerError::config("Planning timeout cannot exceed 900 seconds").into());
        }

        if self.planner.max_duration_days > 365 {
            return Err(
                PlannerError::config("Maximum trip duration cannot exceed 365 days").into(),
            );
        }

        if !(1..=10).contains(&self.planner.hotel_count) {
            return Err(PlannerError::config("Hotel count must be between 1 and 10").into());
        }

        if !(1..=20).contains(&self.planner.place_count) {
            return Err(PlannerError::config("Place count must be between 1 and 20").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlannerError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(
                PlannerError::config("LLM base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        if self.planner.currency.len() != 3
            || !self.planner.currency.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(PlannerError::config(format!(
                "Currency '{}' must be a three-letter ISO code",
                self.planner.currency
            ))
            .into());
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(PlannerError::config(
                "TLS needs both tls_cert_path and tls_key_path",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.planner.currency, "INR");
        assert_eq!(config.planner.hotel_count, 2);
        assert_eq!(config.planner.place_count, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.llm.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = PlannerConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = PlannerConfig::default();
        config.llm.timeout_seconds = 5000;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_backoff_bounds() {
        let mut config = PlannerConfig::default();
        config.llm.retry_min_backoff_ms = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_currency() {
        let mut config = PlannerConfig::default();
        config.planner.currency = "rupees".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("ISO code"));
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = PlannerConfig::default();
        config.llm.model.clear();
        config.planner.currency.clear();
        config.llm.api_key = Some("   ".to_string());
        config.apply_defaults();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.planner.currency, "INR");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("travelplanner-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[llm]\napi_key = \"file-key-123\"\nmodel = \"gemini-2.5-pro\"\n\n[planner]\ncurrency = \"EUR\"\n\n[server]\nport = 9001"
        )
        .unwrap();

        let config = PlannerConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("file-key-123"));
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.planner.currency, "EUR");
        assert_eq!(config.server.port, 9001);
        // untouched sections keep their defaults
        assert_eq!(config.planner.hotel_count, 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = PlannerConfig::default();
        config.llm.api_key = Some("super-secret-key".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = PlannerConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("travelplanner"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}

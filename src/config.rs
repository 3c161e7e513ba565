//! Application configuration.
//!
//! Settings come from environment variables with CLI overrides layered on
//! top by the command module. The model credential is carried here and handed
//! explicitly to the LLM client; nothing downstream reads the environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// OpenAI-compatible endpoint for Gemini models.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default model used for critique steps and chat turns.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "ideaforge.db";

/// Default simulated identity.
pub const DEFAULT_OWNER: &str = "local@ideaforge";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Runtime configuration for the studio.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // LLM settings
    /// Model credential. `None` leaves the completion client unconfigured.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature applied to every request.
    pub temperature: f64,

    // Execution settings
    /// Per-step deadline. `None` disables it.
    pub step_timeout: Option<Duration>,
    /// Whole-run deadline. `None` disables it.
    pub run_timeout: Option<Duration>,

    // Storage settings
    /// SQLite database path.
    pub database_path: PathBuf,
    /// Owner email used for the simulated login.
    pub owner: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            step_timeout: Some(Duration::from_secs(180)),
            run_timeout: None,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            owner: DEFAULT_OWNER.to_string(),
        }
    }
}

impl AppConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `IDEAFORGE_API_KEY`: model credential, falls back to `GOOGLE_API_KEY`
    /// - `IDEAFORGE_API_BASE`: API base URL (default: Gemini OpenAI-compatible endpoint)
    /// - `IDEAFORGE_MODEL`: model identifier (default: gemini-2.5-flash)
    /// - `IDEAFORGE_TEMPERATURE`: sampling temperature (default: 0.7)
    /// - `IDEAFORGE_STEP_TIMEOUT_SECS`: per-step deadline, `0` disables (default: 180)
    /// - `IDEAFORGE_RUN_TIMEOUT_SECS`: whole-run deadline (default: none)
    /// - `IDEAFORGE_DB`: SQLite database path (default: ideaforge.db)
    /// - `IDEAFORGE_OWNER`: simulated login email (default: local@ideaforge)
    ///
    /// A missing credential is not an error here; the review engine reports
    /// it when a run is attempted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.api_key =
            non_empty_env("IDEAFORGE_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"));

        if let Some(val) = non_empty_env("IDEAFORGE_API_BASE") {
            config.api_base = val;
        }

        if let Some(val) = non_empty_env("IDEAFORGE_MODEL") {
            config.model = val;
        }

        if let Some(val) = non_empty_env("IDEAFORGE_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "IDEAFORGE_TEMPERATURE")?;
        }

        if let Some(val) = non_empty_env("IDEAFORGE_STEP_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "IDEAFORGE_STEP_TIMEOUT_SECS")?;
            config.step_timeout = seconds_or_disabled(secs);
        }

        if let Some(val) = non_empty_env("IDEAFORGE_RUN_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "IDEAFORGE_RUN_TIMEOUT_SECS")?;
            config.run_timeout = seconds_or_disabled(secs);
        }

        if let Some(val) = non_empty_env("IDEAFORGE_DB") {
            config.database_path = PathBuf::from(val);
        }

        if let Some(val) = non_empty_env("IDEAFORGE_OWNER") {
            config.owner = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.owner.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "owner cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns true when a model credential is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Builder method to set the credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builder method to set the database path.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Builder method to set the simulated owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Builder method to set the per-step deadline.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Builder method to set the whole-run deadline.
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn seconds_or_disabled(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!((config.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.step_timeout, Some(Duration::from_secs(180)));
        assert!(config.run_timeout.is_none());
        assert_eq!(config.database_path, PathBuf::from("ideaforge.db"));
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_config_builder() {
        let config = AppConfig::new()
            .with_api_key("secret")
            .with_model("gemini-2.5-pro")
            .with_temperature(0.2)
            .with_database_path("/tmp/studio.db")
            .with_owner("writer@example.com")
            .with_step_timeout(None)
            .with_run_timeout(Some(Duration::from_secs(600)));

        assert!(config.has_api_key());
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!((config.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.database_path, PathBuf::from("/tmp/studio.db"));
        assert_eq!(config.owner, "writer@example.com");
        assert!(config.step_timeout.is_none());
        assert_eq!(config.run_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_temperature() {
        let result = AppConfig::default().with_temperature(2.5).validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("temperature"));
    }

    #[test]
    fn test_validation_empty_model() {
        let result = AppConfig::default().with_model("").validate();
        assert!(result.unwrap_err().to_string().contains("model"));
    }

    #[test]
    fn test_validation_blank_owner() {
        let result = AppConfig::default().with_owner("   ").validate();
        assert!(result.unwrap_err().to_string().contains("owner"));
    }

    #[test]
    fn test_parse_env_value() {
        let secs: u64 = parse_env_value("90", "IDEAFORGE_STEP_TIMEOUT_SECS").unwrap();
        assert_eq!(secs, 90);

        let err = parse_env_value::<f64>("warm", "IDEAFORGE_TEMPERATURE").unwrap_err();
        assert!(err.to_string().contains("IDEAFORGE_TEMPERATURE"));
    }

    #[test]
    fn test_zero_seconds_disables_deadline() {
        assert_eq!(seconds_or_disabled(0), None);
        assert_eq!(seconds_or_disabled(5), Some(Duration::from_secs(5)));
    }
}

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, ModelProfile};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error("Invalid backoff configuration: min_backoff_ms ({0}) must not exceed max_backoff_ms ({1})")]
    InvalidBackoff(u64, u64),

    #[error("Invalid reparse_attempts: {0}. Cannot be 0")]
    InvalidReparseAttempts(u32),

    #[error("Upstream base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Model profile '{0}' has an empty model name")]
    EmptyModel(String),

    #[error("Model profile '{0}' has temperature {1}; expected 0.0 to 2.0")]
    InvalidTemperature(String, f32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .prometheia/config.yaml (project config)
    /// 3. .prometheia/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PROMETHEIA_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".prometheia/config.yaml"))
            .merge(Yaml::file(".prometheia/local.yaml"))
            .merge(Env::prefixed("PROMETHEIA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("PROMETHEIA_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if config.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        Self::validate_retry(&config.retry)?;

        if config.pipeline.reparse_attempts == 0 {
            return Err(ConfigError::InvalidReparseAttempts(config.pipeline.reparse_attempts));
        }

        if config.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }

        for profile in [&config.models.fast, &config.models.quality, &config.models.structured] {
            Self::validate_profile(profile)?;
        }

        if config.server.port == 0 {
            return Err(ConfigError::ValidationFailed(
                "server port cannot be 0".to_string(),
            ));
        }

        let catalog_names = config
            .catalog
            .agents
            .iter()
            .map(|agent| &agent.name)
            .chain(config.catalog.tools.iter().map(|tool| &tool.name));
        for name in catalog_names {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "catalog entries need a name".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_retry(retry: &crate::domain::models::RetryConfig) -> Result<(), ConfigError> {
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(retry.max_attempts));
        }

        if retry.min_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.min_backoff_ms,
                retry.max_backoff_ms,
            ));
        }

        Ok(())
    }

    fn validate_profile(profile: &ModelProfile) -> Result<(), ConfigError> {
        if profile.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel(profile.name.clone()));
        }

        if !(0.0..=2.0).contains(&profile.temperature) {
            return Err(ConfigError::InvalidTemperature(
                profile.name.clone(),
                profile.temperature,
            ));
        }

        if let Some(retry) = &profile.retry {
            Self::validate_retry(retry)?;
        }

        Ok(())
    }
}

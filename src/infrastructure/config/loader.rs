use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Backend model cannot be empty")]
    EmptyModel,

    #[error("Invalid {0}: must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid requests_per_second: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Config file not found: {0}")]
    MissingFile(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .faultline/config.yaml (project config)
    /// 3. .faultline/local.yaml (project local overrides, optional)
    /// 4. An explicit `--config` file
    /// 5. Environment variables (FAULTLINE_* prefix, `__` for nesting)
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.display().to_string()).into());
            }
        }

        let config: Config = Self::figment(explicit)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".faultline/config.yaml"))
            .merge(Yaml::file(".faultline/local.yaml"));

        if let Some(path) = explicit {
            figment = figment.merge(Yaml::file(path));
        }

        figment.merge(Env::prefixed("FAULTLINE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let backend = &config.backend;
        if backend.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        if backend.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(backend.requests_per_second));
        }

        if backend.initial_backoff_ms >= backend.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                backend.initial_backoff_ms,
                backend.max_backoff_ms,
            ));
        }

        if backend.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("poll_interval_ms"));
        }

        let generation = &config.generation;
        let counts = [
            ("iterations", generation.iterations),
            ("finder_iterations", generation.finder_iterations),
            ("candidates_per_round", generation.candidates_per_round),
            ("negative_target", generation.negative_target),
            ("positive_target", generation.positive_target),
            ("concurrency", generation.concurrency),
        ];
        if let Some(&(name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue(name));
        }

        if config.framework.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("framework timeout_secs"));
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
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

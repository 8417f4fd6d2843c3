//! Configuration loading for the optimizer.
//!
//! Reads a YAML file, interpolates environment variables, applies serde
//! defaults and validates every section before any simulation runs.
//!
//! # Usage
//!
//! ```rust,ignore
//! use backtest_optimizer::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("sweeps/btc.yaml"))?;
//!
//! println!("strategy: {}", config.sweep.strategy);
//! ```

mod observability;
mod sweep;

use serde::Deserialize;
use thiserror::Error;

use crate::backtest::RunConfig;
use crate::backtest::WalkForwardSplitter;
use crate::backtest::parallel::ParameterGrid;

pub use observability::{LogFormat, LoggingConfig};
pub use sweep::SweepConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Simulation settings shared by every run.
    #[serde(default)]
    pub run: RunConfig,
    /// Sweep definition.
    pub sweep: SweepConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |e: &dyn std::fmt::Display| ConfigError::ValidationError(e.to_string());

    config.run.validate().map_err(|e| invalid(&e))?;
    config.sweep.parallel().validate().map_err(|e| invalid(&e))?;

    // Reject bad ranges and oversized grids before any data is loaded
    ParameterGrid::from_parameter_specs(&config.sweep.parameters).map_err(|e| invalid(&e))?;

    if let Some(walk_forward) = &config.sweep.walk_forward {
        walk_forward.validate().map_err(|e| invalid(&e))?;
        WalkForwardSplitter::new(walk_forward.train_ratio).map_err(|e| invalid(&e))?;
    }

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "logging.level must not be empty".to_string(),
        ));
    }

    Ok(())
}

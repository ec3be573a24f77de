//! Configuration module for the trading agent.
//!
//! Loads the YAML configuration file, interpolates environment variables, and
//! validates the result.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trading_agent::config::{Config, load_config};
//!
//! // Load from default path (agent_config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("configs/backtest.yaml"))?;
//!
//! println!("interval: {:?}", config.agent.execution_interval);
//! ```

mod agent;
mod backtest;
mod observability;
mod strategy;
mod validation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use agent::{AgentConfig, parse_duration};
pub use backtest::BacktestConfig;
pub use observability::{LogFormat, LoggingConfig};
pub use strategy::{StrategySettings, SwingtradeConfig};
pub use validation::{RunMode, StartupValidation, validate_config, validate_startup};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "agent_config.yaml";

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
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Agent loop configuration.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Strategy configuration.
    #[serde(default)]
    pub strategy_settings: StrategySettings,
    /// Backtest configuration.
    #[serde(default)]
    pub backtest: BacktestConfig,
}

impl Config {
    /// Effective default log filter.
    #[must_use]
    pub fn log_level(&self) -> &str {
        self.logging
            .level
            .as_deref()
            .unwrap_or(&self.agent.log_level)
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to `agent_config.yaml`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
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

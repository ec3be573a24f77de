//! Tracing Setup
//!
//! Installs a `tracing-subscriber` fmt subscriber for the process.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives, overriding the configured level
//! - `logging.format`: `pretty` (default) or `json`
//!
//! # Usage
//!
//! ```rust,ignore
//! use trading_agent::telemetry::init_tracing;
//!
//! let config = load_config(None)?;
//! init_tracing(&config.logging, config.log_level())?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Tracing initialization failure.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Build the filter: `RUST_LOG` when set, otherwise `fallback_level`.
///
/// # Errors
///
/// [`TelemetryError::InvalidFilter`] if `fallback_level` does not parse.
pub fn build_filter(fallback_level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(fallback_level).map_err(|e| TelemetryError::InvalidFilter {
        directive: fallback_level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig, fallback_level: &str) -> Result<(), TelemetryError> {
    let filter = build_filter(fallback_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))
}

//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset. Falls back to `agent.log_level`.
    #[serde(default)]
    pub level: Option<String>,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}


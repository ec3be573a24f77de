//! Agent loop settings.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::application::services::TickLoopConfig;

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Strategy name. Only `swingtrade` is implemented.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Time between ticks, e.g. `30s`, `1m`, `2h`.
    #[serde(
        default = "default_execution_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub execution_interval: Duration,
    /// Log level used when `logging.level` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Exchange timezone (IANA name).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Deadline for each broker call during resync.
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            execution_interval: default_execution_interval(),
            log_level: default_log_level(),
            timezone: default_timezone(),
            sync_timeout_secs: default_sync_timeout_secs(),
        }
    }
}

impl AgentConfig {
    /// Tick loop timing.
    #[must_use]
    pub const fn tick_loop_config(&self) -> TickLoopConfig {
        TickLoopConfig {
            interval: self.execution_interval,
            sync_timeout: Duration::from_secs(self.sync_timeout_secs),
        }
    }
}

fn default_strategy() -> String {
    "swingtrade".to_string()
}

const fn default_execution_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

const fn default_sync_timeout_secs() -> u64 {
    10
}

/// Parse `<n>ms`, `<n>s`, `<n>m`, `<n>h`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{text}'"))),
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}s", duration.as_secs()))
}

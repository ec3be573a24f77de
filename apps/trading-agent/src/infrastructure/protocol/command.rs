//! Message command classification (`p_cmd`).

use std::fmt;

use super::codec::Fields;
use crate::infrastructure::dispatch::EventKind;

/// Field carrying the message command.
pub const COMMAND_FIELD: &str = "p_cmd";

/// Command of one wire message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// `FD`: price feed.
    Feed,
    /// `EC`: execution report.
    Execution,
    /// `ST`: status notification.
    Status,
    /// `KP`: keep-alive.
    KeepAlive,
    /// Any other code.
    Unknown(String),
}

impl Command {
    /// Classify a command code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "FD" => Self::Feed,
            "EC" => Self::Execution,
            "ST" => Self::Status,
            "KP" => Self::KeepAlive,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Classify a parsed message, or `None` if it has no `p_cmd`.
    #[must_use]
    pub fn of(fields: &Fields) -> Option<Self> {
        fields.get(COMMAND_FIELD).map(|code| Self::from_code(code))
    }

    /// Wire code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Feed => "FD",
            Self::Execution => "EC",
            Self::Status => "ST",
            Self::KeepAlive => "KP",
            Self::Unknown(code) => code,
        }
    }

    /// Event kind to dispatch to. Keep-alives and unknown commands have none.
    #[must_use]
    pub const fn event_kind(&self) -> Option<EventKind> {
        match self {
            Self::Feed => Some(EventKind::Feed),
            Self::Execution => Some(EventKind::Execution),
            Self::Status => Some(EventKind::Status),
            Self::KeepAlive | Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

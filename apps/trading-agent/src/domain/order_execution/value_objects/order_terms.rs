//! Order type and validity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute at the prevailing price.
    #[default]
    Market,
    /// Execute at `price` or better.
    Limit,
    /// Becomes a market order once `trigger_price` trades.
    Stop,
    /// Becomes a limit order at `price` once `trigger_price` trades.
    StopLimit,
}

impl OrderType {
    /// Returns true if the order carries a limit price.
    #[must_use]
    pub const fn has_limit_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    /// Returns true if the order carries a trigger price.
    #[must_use]
    pub const fn has_trigger_price(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::Stop => write!(f, "STOP"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// How long the order stays working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Valid for the current trading day only.
    #[default]
    Day,
    /// Good until canceled.
    Gtc,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "DAY"),
            Self::Gtc => write!(f, "GTC"),
        }
    }
}

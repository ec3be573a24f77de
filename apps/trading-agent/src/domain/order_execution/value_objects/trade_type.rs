//! Trade direction of an order or execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl TradeType {
    /// Decode the broker's side code (`"1"` buy, `"2"` sell).
    #[must_use]
    pub fn from_broker_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::Buy),
            "2" => Some(Self::Sell),
            _ => None,
        }
    }

    /// The broker's side code for this direction.
    #[must_use]
    pub const fn broker_code(&self) -> &'static str {
        match self {
            Self::Buy => "1",
            Self::Sell => "2",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_type_from_broker_code() {
        assert_eq!(TradeType::from_broker_code("1"), Some(TradeType::Buy));
        assert_eq!(TradeType::from_broker_code("2"), Some(TradeType::Sell));
        assert_eq!(TradeType::from_broker_code("3"), None);
        assert_eq!(TradeType::from_broker_code(""), None);
    }

    #[test]
    fn trade_type_broker_code_round_trip() {
        for side in [TradeType::Buy, TradeType::Sell] {
            assert_eq!(TradeType::from_broker_code(side.broker_code()), Some(side));
        }
    }

    #[test]
    fn trade_type_serde() {
        let json = serde_json::to_string(&TradeType::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
    }
}

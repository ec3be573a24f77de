//! Trade signals produced by the external strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::Symbol;

/// What the strategy wants done with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    /// Open a position.
    Buy,
    /// Close the held position.
    Sell,
}

impl SignalAction {
    /// Decode the signal file byte (`1` buy, `2` sell).
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Buy),
            2 => Some(Self::Sell),
            _ => None,
        }
    }

    /// Signal file byte.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        match self {
            Self::Buy => 1,
            Self::Sell => 2,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One signal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Target symbol.
    pub symbol: Symbol,
    /// Requested action.
    pub action: SignalAction,
}

impl TradeSignal {
    /// Create a signal.
    #[must_use]
    pub const fn new(symbol: Symbol, action: SignalAction) -> Self {
        Self { symbol, action }
    }
}

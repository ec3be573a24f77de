//! Position account type: the accounting bucket an order trades against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cash or margin bucket, and for margin whether the order opens or closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionAccountType {
    /// Unleveraged holding.
    #[default]
    Cash,
    /// Opening leg of a margin position.
    MarginNew,
    /// Closing leg of a margin position.
    MarginRepay,
}

impl PositionAccountType {
    /// Returns true for either margin leg.
    #[must_use]
    pub const fn is_margin(&self) -> bool {
        matches!(self, Self::MarginNew | Self::MarginRepay)
    }
}

impl fmt::Display for PositionAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "CASH"),
            Self::MarginNew => write!(f, "MARGIN_NEW"),
            Self::MarginRepay => write!(f, "MARGIN_REPAY"),
        }
    }
}

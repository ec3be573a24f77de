//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
///
/// `New`, `PartiallyFilled` and `Filled` are derived from the executions an order owns.
/// `Canceled`, `Rejected` and `Expired` come from the broker snapshot or a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, nothing executed yet.
    New,
    /// Some but not all of the quantity executed.
    PartiallyFilled,
    /// Entire quantity executed.
    Filled,
    /// Canceled before completion.
    Canceled,
    /// Rejected by the broker.
    Rejected,
    /// Expired at the end of its validity.
    Expired,
}

impl OrderStatus {
    /// Returns true while the order can still receive executions.
    #[must_use]
    pub const fn is_unexecuted(&self) -> bool {
        matches!(self, Self::New | Self::PartiallyFilled)
    }

    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_unexecuted()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_unexecuted() {
        assert!(OrderStatus::New.is_unexecuted());
        assert!(OrderStatus::PartiallyFilled.is_unexecuted());
        assert!(!OrderStatus::Filled.is_unexecuted());
        assert!(!OrderStatus::Canceled.is_unexecuted());
        assert!(!OrderStatus::Rejected.is_unexecuted());
        assert!(!OrderStatus::Expired.is_unexecuted());
    }

    #[test]
    fn order_status_is_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
    }

    #[test]
    fn order_status_display() {
        assert_eq!(OrderStatus::PartiallyFilled.to_string(), "PARTIALLY_FILLED");
        assert_eq!(OrderStatus::Filled.to_string(), "FILLED");
    }
}

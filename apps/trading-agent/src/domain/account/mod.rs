//! Account Bounded Context
//!
//! The broker-reported cash balance. Replaced wholesale on every sync.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account balance snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Cash on hand.
    pub cash: Decimal,
    /// Funds available for new orders.
    pub buying_power: Decimal,
}

impl Balance {
    /// Create a balance.
    #[must_use]
    pub const fn new(cash: Decimal, buying_power: Decimal) -> Self {
        Self { cash, buying_power }
    }

    /// Cash account where all cash is available to trade.
    #[must_use]
    pub const fn all_cash(cash: Decimal) -> Self {
        Self::new(cash, cash)
    }
}

//! Position entity and its identity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_execution::PositionAccountType;
use crate::domain::shared::Symbol;

/// Long or short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionType {
    /// Shares held.
    Long,
    /// Shares owed.
    Short,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Position identity: symbol plus accounting bucket.
///
/// Cash and margin holdings of the same symbol are independent positions. Both margin
/// legs share one bucket, so a `MarginRepay` order finds the position its `MarginNew`
/// order opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    /// Held symbol.
    pub symbol: Symbol,
    /// Accounting bucket (`Cash` or `MarginNew`).
    pub account_type: PositionAccountType,
}

impl PositionKey {
    /// Key for `symbol` in the bucket that `account_type` trades against.
    #[must_use]
    pub fn new(symbol: Symbol, account_type: PositionAccountType) -> Self {
        let account_type = match account_type {
            PositionAccountType::Cash => PositionAccountType::Cash,
            PositionAccountType::MarginNew | PositionAccountType::MarginRepay => {
                PositionAccountType::MarginNew
            }
        };
        Self {
            symbol,
            account_type,
        }
    }

    /// Cash bucket key for `symbol`.
    #[must_use]
    pub fn cash(symbol: Symbol) -> Self {
        Self::new(symbol, PositionAccountType::Cash)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.account_type)
    }
}

/// An open holding.
///
/// Quantity is strictly positive while the position exists; accounting deletes a
/// position instead of storing it at zero. `highest_price` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    key: PositionKey,
    position_type: PositionType,
    average_price: Decimal,
    quantity: i64,
    highest_price: Decimal,
    trailing_stop_price: Decimal,
}

impl Position {
    /// Rebuild a position from a snapshot.
    #[must_use]
    pub const fn new(
        key: PositionKey,
        position_type: PositionType,
        average_price: Decimal,
        quantity: i64,
        highest_price: Decimal,
    ) -> Self {
        Self {
            key,
            position_type,
            average_price,
            quantity,
            highest_price,
            trailing_stop_price: Decimal::ZERO,
        }
    }

    /// Open a long position at `price`.
    #[must_use]
    pub const fn open_long(key: PositionKey, price: Decimal, quantity: i64) -> Self {
        Self::new(key, PositionType::Long, price, quantity, price)
    }

    /// Attach a trailing stop (snapshot rebuild).
    #[must_use]
    pub const fn with_trailing_stop(mut self, price: Decimal) -> Self {
        self.trailing_stop_price = price;
        self
    }

    /// Identity.
    #[must_use]
    pub const fn key(&self) -> &PositionKey {
        &self.key
    }

    /// Held symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.key.symbol
    }

    /// Accounting bucket.
    #[must_use]
    pub const fn account_type(&self) -> PositionAccountType {
        self.key.account_type
    }

    /// Long or short.
    #[must_use]
    pub const fn position_type(&self) -> PositionType {
        self.position_type
    }

    /// Weighted average cost.
    #[must_use]
    pub const fn average_price(&self) -> Decimal {
        self.average_price
    }

    /// Shares held or owed.
    #[must_use]
    pub const fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Highest price observed since the position opened.
    #[must_use]
    pub const fn highest_price(&self) -> Decimal {
        self.highest_price
    }

    /// Active trailing stop, zero while inactive.
    #[must_use]
    pub const fn trailing_stop_price(&self) -> Decimal {
        self.trailing_stop_price
    }

    /// True once a trailing stop has been armed.
    #[must_use]
    pub fn has_trailing_stop(&self) -> bool {
        self.trailing_stop_price > Decimal::ZERO
    }

    /// Raise the highest price if `price` exceeds it. Returns true if it moved.
    pub fn raise_highest_price(&mut self, price: Decimal) -> bool {
        if price > self.highest_price {
            self.highest_price = price;
            true
        } else {
            false
        }
    }

    /// Set the trailing stop price.
    pub const fn set_trailing_stop_price(&mut self, price: Decimal) {
        self.trailing_stop_price = price;
    }

    /// Fold `quantity` shares at `price` into the weighted average.
    ///
    /// Returns `None` and leaves the position untouched if the quantity or the cost
    /// basis overflows.
    pub(crate) fn accumulate(
        &mut self,
        price: Decimal,
        quantity: i64,
        position_type: PositionType,
    ) -> Option<()> {
        let new_qty = self.quantity.checked_add(quantity)?;
        let total = Decimal::from(new_qty);
        let average_price = if total.is_zero() {
            self.average_price
        } else {
            let held = self.average_price.checked_mul(Decimal::from(self.quantity))?;
            let added = price.checked_mul(Decimal::from(quantity))?;
            held.checked_add(added)?.checked_div(total)?
        };
        self.average_price = average_price;
        self.quantity = new_qty;
        self.position_type = position_type;
        Some(())
    }

    /// Remove `quantity` shares without touching the average.
    ///
    /// Returns `None` and leaves the position untouched on overflow.
    pub(crate) fn reduce(&mut self, quantity: i64) -> Option<()> {
        self.quantity = self.quantity.checked_sub(quantity)?;
        Some(())
    }
}

//! Order aggregate root.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::execution::Execution;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{
    OrderStatus, OrderType, PositionAccountType, TimeInForce, TradeType,
};
use crate::domain::shared::{ExecutionId, OrderId, Symbol};

/// Parameters for a broker-acknowledged order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Broker-assigned order ID.
    pub order_id: OrderId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Buy or sell.
    pub trade_type: TradeType,
    /// Pricing behavior.
    pub order_type: OrderType,
    /// Ordered quantity (shares).
    pub quantity: i64,
    /// Limit price, zero for market orders.
    pub price: Decimal,
    /// Trigger price, zero unless a stop order.
    pub trigger_price: Decimal,
    /// Order validity.
    pub time_in_force: TimeInForce,
    /// Accounting bucket.
    pub account_type: PositionAccountType,
}

impl NewOrder {
    /// Market order for `quantity` shares, valid for the day.
    #[must_use]
    pub fn market(
        order_id: OrderId,
        symbol: Symbol,
        trade_type: TradeType,
        quantity: i64,
        account_type: PositionAccountType,
    ) -> Self {
        Self {
            order_id,
            symbol,
            trade_type,
            order_type: OrderType::Market,
            quantity,
            price: Decimal::ZERO,
            trigger_price: Decimal::ZERO,
            time_in_force: TimeInForce::Day,
            account_type,
        }
    }
}

/// Order aggregate root.
///
/// Status is derived from the owned executions while the order is open: nothing
/// executed is `New`, a partial total is `PartiallyFilled`, the full quantity is
/// `Filled`. The invariant `executed_quantity() <= quantity()` holds for every order
/// this type hands out.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    trade_type: TradeType,
    order_type: OrderType,
    quantity: i64,
    price: Decimal,
    trigger_price: Decimal,
    time_in_force: TimeInForce,
    status: OrderStatus,
    account_type: PositionAccountType,
    executions: Vec<Execution>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in status `New`.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive.
    pub fn new(params: NewOrder) -> Result<Self, OrderError> {
        if params.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                order_id: params.order_id.to_string(),
                quantity: params.quantity,
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: params.order_id,
            symbol: params.symbol,
            trade_type: params.trade_type,
            order_type: params.order_type,
            quantity: params.quantity,
            price: params.price,
            trigger_price: params.trigger_price,
            time_in_force: params.time_in_force,
            status: OrderStatus::New,
            account_type: params.account_type,
            executions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Override the status with one reported by a broker snapshot.
    #[must_use]
    pub const fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Override the creation time (used when rebuilding history).
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Broker order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Traded symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Buy or sell.
    #[must_use]
    pub const fn trade_type(&self) -> TradeType {
        self.trade_type
    }

    /// Pricing behavior.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Ordered quantity.
    #[must_use]
    pub const fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Limit price (zero for market orders).
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Trigger price (zero unless a stop order).
    #[must_use]
    pub const fn trigger_price(&self) -> Decimal {
        self.trigger_price
    }

    /// Order validity.
    #[must_use]
    pub const fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// True if the order trades a margin bucket.
    #[must_use]
    pub const fn is_margin(&self) -> bool {
        self.account_type.is_margin()
    }

    /// Accounting bucket.
    #[must_use]
    pub const fn account_type(&self) -> PositionAccountType {
        self.account_type
    }

    /// Recorded executions, oldest first.
    #[must_use]
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    /// When the order was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the order last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of executed quantity.
    #[must_use]
    pub fn executed_quantity(&self) -> i64 {
        self.executions.iter().map(|e| e.quantity).sum()
    }

    /// Quantity still open.
    #[must_use]
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.executed_quantity()
    }

    /// True if an execution with this ID is already recorded.
    #[must_use]
    pub fn has_execution(&self, execution_id: &ExecutionId) -> bool {
        self.executions
            .iter()
            .any(|e| &e.execution_id == execution_id)
    }

    /// True while the order can still receive executions.
    #[must_use]
    pub const fn is_unexecuted(&self) -> bool {
        self.status.is_unexecuted()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Record an execution and recompute the status.
    ///
    /// A late execution on a `Canceled`, `Rejected` or `Expired` order is recorded but
    /// the terminal status is kept, so the order never becomes unexecuted again.
    ///
    /// Returns `Ok(false)` without touching the order if the execution ID is already
    /// recorded. On error the order is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if the execution belongs to another order or symbol, trades the
    /// other direction, has a non-positive quantity, or would push the executed total
    /// past the ordered quantity.
    pub fn record_execution(&mut self, execution: Execution) -> Result<bool, OrderError> {
        if self.has_execution(&execution.execution_id) {
            return Ok(false);
        }

        self.check_execution(&execution)?;

        let total = self
            .executed_quantity()
            .checked_add(execution.quantity)
            .filter(|total| *total <= self.quantity)
            .ok_or_else(|| OrderError::Overfill {
                order_id: self.id.to_string(),
                ordered: self.quantity,
                executed: self.executed_quantity().saturating_add(execution.quantity),
            })?;

        self.executions.push(execution);
        if !self.status.is_terminal() {
            self.status = Self::derive_status(total, self.quantity);
        }
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Mark the order canceled.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already terminal.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::NotCancelable {
                order_id: self.id.to_string(),
                status: self.status,
            });
        }
        self.status = OrderStatus::Canceled;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn check_execution(&self, execution: &Execution) -> Result<(), OrderError> {
        let mismatch = |reason: String| OrderError::ExecutionMismatch {
            order_id: self.id.to_string(),
            execution_id: execution.execution_id.to_string(),
            reason,
        };

        if execution.order_id != self.id {
            return Err(mismatch(format!(
                "execution references order {}",
                execution.order_id
            )));
        }
        if execution.symbol != self.symbol {
            return Err(mismatch(format!(
                "symbol {} does not match order symbol {}",
                execution.symbol, self.symbol
            )));
        }
        if execution.trade_type != self.trade_type {
            return Err(mismatch(format!(
                "side {} does not match order side {}",
                execution.trade_type, self.trade_type
            )));
        }
        if execution.quantity <= 0 {
            return Err(mismatch(format!(
                "non-positive quantity {}",
                execution.quantity
            )));
        }
        Ok(())
    }

    const fn derive_status(executed: i64, ordered: i64) -> OrderStatus {
        if executed == 0 {
            OrderStatus::New
        } else if executed < ordered {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Filled
        }
    }
}

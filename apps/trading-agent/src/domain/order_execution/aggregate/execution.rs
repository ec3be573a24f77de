//! Execution entity: one confirmed fill reported by the broker.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::TradeType;
use crate::domain::shared::{ExecutionId, OrderId, Symbol};

/// A confirmed execution.
///
/// Immutable once recorded on its order: [`Order`](super::Order) only hands out shared
/// references to the executions it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique execution ID (`{order_id}-{sequence}`).
    pub execution_id: ExecutionId,
    /// Order this execution belongs to.
    pub order_id: OrderId,
    /// Executed symbol.
    pub symbol: Symbol,
    /// Direction of the execution.
    pub trade_type: TradeType,
    /// Executed quantity (shares).
    pub quantity: i64,
    /// Executed price.
    pub price: Decimal,
    /// When the broker reported the execution.
    pub executed_at: DateTime<Utc>,
    /// Commission charged.
    pub commission: Decimal,
}

impl Execution {
    /// Create an execution with zero commission.
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        order_id: OrderId,
        symbol: Symbol,
        trade_type: TradeType,
        quantity: i64,
        price: Decimal,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id,
            order_id,
            symbol,
            trade_type,
            quantity,
            price,
            executed_at,
            commission: Decimal::ZERO,
        }
    }

    /// Notional value (`price * quantity`).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

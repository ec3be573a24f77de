//! Trade Service Port (Driven Port)
//!
//! The single trade-execution interface. The live broker adapter and the backtest
//! simulator both implement it, so the decision loop cannot tell them apart.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::Balance;
use crate::domain::market::PriceBar;
use crate::domain::order_execution::{
    Order, OrderType, PositionAccountType, TimeInForce, TradeType,
};
use crate::domain::position::{Position, PositionKey};
use crate::domain::shared::{OrderId, Symbol};

/// Request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Buy or sell.
    pub trade_type: TradeType,
    /// Order type.
    pub order_type: OrderType,
    /// Shares.
    pub quantity: i64,
    /// Limit price, zero for market orders.
    pub price: Decimal,
    /// Stop trigger, zero unless the order type has one.
    pub trigger_price: Decimal,
    /// Validity.
    pub time_in_force: TimeInForce,
    /// Accounting bucket.
    pub account_type: PositionAccountType,
}

impl PlaceOrderRequest {
    /// Market order request.
    #[must_use]
    pub const fn market(
        symbol: Symbol,
        trade_type: TradeType,
        quantity: i64,
        account_type: PositionAccountType,
    ) -> Self {
        Self {
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

    /// Limit order request.
    #[must_use]
    pub const fn limit(
        symbol: Symbol,
        trade_type: TradeType,
        quantity: i64,
        price: Decimal,
        account_type: PositionAccountType,
    ) -> Self {
        Self {
            symbol,
            trade_type,
            order_type: OrderType::Limit,
            quantity,
            price,
            trigger_price: Decimal::ZERO,
            time_in_force: TimeInForce::Day,
            account_type,
        }
    }

    /// Set time in force.
    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }
}

/// Trade service error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// Broker call failed; retried on the next tick.
    #[error("Trade service connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// Order rejected by the broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Buy exceeds buying power.
    #[error("Insufficient funds for {symbol}: required {required}, available {available}")]
    InsufficientFunds {
        /// Symbol.
        symbol: String,
        /// Order cost.
        required: Decimal,
        /// Buying power.
        available: Decimal,
    },

    /// Sell exceeds the held quantity.
    #[error("Insufficient position for {symbol}: requested {requested}, held {held}")]
    InsufficientPosition {
        /// Symbol.
        symbol: String,
        /// Shares requested.
        requested: i64,
        /// Shares held.
        held: i64,
    },

    /// No position is held under the key.
    #[error("No position held for {key}")]
    PositionNotFound {
        /// Position key.
        key: String,
    },

    /// No price available for the symbol.
    #[error("No price available for {symbol}")]
    PriceUnavailable {
        /// Symbol.
        symbol: String,
    },

    /// The implementation does not support the operation.
    #[error("Operation not supported: {operation}")]
    Unsupported {
        /// Operation name.
        operation: String,
    },

    /// Call exceeded its deadline.
    #[error("Trade service call timed out after {seconds}s")]
    Timeout {
        /// Deadline in seconds.
        seconds: u64,
    },
}

impl TradeError {
    /// True for failures that a later tick may not hit again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Port for trade execution and account queries.
#[async_trait]
pub trait TradeService: Send + Sync {
    /// Current balance.
    async fn get_balance(&self) -> Result<Balance, TradeError>;

    /// All open positions.
    async fn get_positions(&self) -> Result<Vec<Position>, TradeError>;

    /// All orders the broker still reports.
    async fn get_orders(&self) -> Result<Vec<Order>, TradeError>;

    /// Place an order and return it as accepted.
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, TradeError>;

    /// Cancel an order.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), TradeError>;

    /// Persist the highest price and trailing stop of the position under `key`, so the
    /// next positions snapshot carries them.
    async fn update_position_tracking(
        &self,
        key: &PositionKey,
        highest_price: Decimal,
        trailing_stop_price: Decimal,
    ) -> Result<(), TradeError>;

    /// Up to `days` daily bars ending today, oldest first.
    async fn get_price_history(
        &self,
        symbol: &Symbol,
        days: usize,
    ) -> Result<Vec<PriceBar>, TradeError>;

    /// Current price, if this service quotes one.
    ///
    /// Live adapters leave this to the price feed and return `None`.
    async fn get_price(&self, _symbol: &Symbol) -> Result<Option<Decimal>, TradeError> {
        Ok(None)
    }
}

//! Domain Events
//!
//! Records of state transitions emitted after a change is committed. Subscribers use
//! them for auditing; they never feed back into accounting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::order_execution::{Execution, Order, OrderStatus, PositionAccountType, TradeType};
use crate::domain::position::{Position, PositionKey, PositionType};
use crate::domain::shared::{ExecutionId, OrderId, Symbol};

/// Subscription key for a class of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEventType {
    /// An order was accepted by the trade service.
    OrderPlaced,
    /// An execution was recorded against an order.
    OrderExecuted,
    /// An order was cancelled.
    OrderCancelled,
    /// A position was created.
    PositionOpened,
    /// A position was deleted.
    PositionClosed,
}

impl DomainEventType {
    /// Every event type.
    pub const ALL: [Self; 5] = [
        Self::OrderPlaced,
        Self::OrderExecuted,
        Self::OrderCancelled,
        Self::PositionOpened,
        Self::PositionClosed,
    ];

    /// Stable event type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "ORDER_PLACED",
            Self::OrderExecuted => "ORDER_EXECUTED",
            Self::OrderCancelled => "ORDER_CANCELLED",
            Self::PositionOpened => "POSITION_OPENED",
            Self::PositionClosed => "POSITION_CLOSED",
        }
    }
}

impl fmt::Display for DomainEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All domain events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    /// Order placed.
    OrderPlaced(OrderPlaced),
    /// Execution recorded.
    OrderExecuted(OrderExecuted),
    /// Order cancelled.
    OrderCancelled(OrderCancelled),
    /// Position opened.
    PositionOpened(PositionOpened),
    /// Position closed.
    PositionClosed(PositionClosed),
}

impl DomainEvent {
    /// Event for a just-placed order.
    #[must_use]
    pub fn order_placed(order: &Order) -> Self {
        Self::OrderPlaced(OrderPlaced {
            event_id: Uuid::new_v4(),
            order_id: order.id().clone(),
            symbol: order.symbol().clone(),
            trade_type: order.trade_type(),
            quantity: order.quantity(),
            account_type: order.account_type(),
            occurred_at: Utc::now(),
        })
    }

    /// Event for an execution newly recorded on `order`.
    #[must_use]
    pub fn order_executed(order: &Order, execution: &Execution) -> Self {
        Self::OrderExecuted(OrderExecuted {
            event_id: Uuid::new_v4(),
            order_id: order.id().clone(),
            execution_id: execution.execution_id.clone(),
            symbol: execution.symbol.clone(),
            trade_type: execution.trade_type,
            quantity: execution.quantity,
            price: execution.price,
            status: order.status(),
            occurred_at: Utc::now(),
        })
    }

    /// Event for a cancelled order.
    #[must_use]
    pub fn order_cancelled(order_id: &OrderId) -> Self {
        Self::OrderCancelled(OrderCancelled {
            event_id: Uuid::new_v4(),
            order_id: order_id.clone(),
            occurred_at: Utc::now(),
        })
    }

    /// Event for a newly created position.
    #[must_use]
    pub fn position_opened(position: &Position) -> Self {
        Self::PositionOpened(PositionOpened {
            event_id: Uuid::new_v4(),
            key: position.key().clone(),
            position_type: position.position_type(),
            average_price: position.average_price(),
            quantity: position.quantity(),
            occurred_at: Utc::now(),
        })
    }

    /// Event for a deleted position.
    #[must_use]
    pub fn position_closed(position: &Position, realized_pnl: Decimal) -> Self {
        Self::PositionClosed(PositionClosed {
            event_id: Uuid::new_v4(),
            key: position.key().clone(),
            average_price: position.average_price(),
            realized_pnl,
            occurred_at: Utc::now(),
        })
    }

    /// Unique event ID.
    #[must_use]
    pub const fn event_id(&self) -> Uuid {
        match self {
            Self::OrderPlaced(e) => e.event_id,
            Self::OrderExecuted(e) => e.event_id,
            Self::OrderCancelled(e) => e.event_id,
            Self::PositionOpened(e) => e.event_id,
            Self::PositionClosed(e) => e.event_id,
        }
    }

    /// ID of the aggregate the event belongs to: an order ID or a position key.
    #[must_use]
    pub fn aggregate_id(&self) -> String {
        match self {
            Self::OrderPlaced(e) => e.order_id.to_string(),
            Self::OrderExecuted(e) => e.order_id.to_string(),
            Self::OrderCancelled(e) => e.order_id.to_string(),
            Self::PositionOpened(e) => e.key.to_string(),
            Self::PositionClosed(e) => e.key.to_string(),
        }
    }

    /// Event type.
    #[must_use]
    pub const fn event_type(&self) -> DomainEventType {
        match self {
            Self::OrderPlaced(_) => DomainEventType::OrderPlaced,
            Self::OrderExecuted(_) => DomainEventType::OrderExecuted,
            Self::OrderCancelled(_) => DomainEventType::OrderCancelled,
            Self::PositionOpened(_) => DomainEventType::PositionOpened,
            Self::PositionClosed(_) => DomainEventType::PositionClosed,
        }
    }

    /// When the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::OrderPlaced(e) => e.occurred_at,
            Self::OrderExecuted(e) => e.occurred_at,
            Self::OrderCancelled(e) => e.occurred_at,
            Self::PositionOpened(e) => e.occurred_at,
            Self::PositionClosed(e) => e.occurred_at,
        }
    }
}

/// Event: order placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// Event ID.
    pub event_id: Uuid,
    /// Order ID.
    pub order_id: OrderId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub trade_type: TradeType,
    /// Ordered quantity.
    pub quantity: i64,
    /// Account type.
    pub account_type: PositionAccountType,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: execution recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExecuted {
    /// Event ID.
    pub event_id: Uuid,
    /// Order ID.
    pub order_id: OrderId,
    /// Execution ID.
    pub execution_id: ExecutionId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub trade_type: TradeType,
    /// Executed quantity.
    pub quantity: i64,
    /// Executed price.
    pub price: Decimal,
    /// Order status after the execution.
    pub status: OrderStatus,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: order cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// Event ID.
    pub event_id: Uuid,
    /// Order ID.
    pub order_id: OrderId,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: position opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpened {
    /// Event ID.
    pub event_id: Uuid,
    /// Position identity.
    pub key: PositionKey,
    /// Direction.
    pub position_type: PositionType,
    /// Entry price.
    pub average_price: Decimal,
    /// Opening quantity.
    pub quantity: i64,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: position closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionClosed {
    /// Event ID.
    pub event_id: Uuid,
    /// Position identity.
    pub key: PositionKey,
    /// Average cost at close.
    pub average_price: Decimal,
    /// Realized profit or loss of the closing execution.
    pub realized_pnl: Decimal,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

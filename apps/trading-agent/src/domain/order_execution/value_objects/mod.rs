//! Order Execution Value Objects
//!
//! Immutable types describing orders and executions.

mod account_type;
mod order_status;
mod order_terms;
mod trade_type;

pub use account_type::PositionAccountType;
pub use order_status::OrderStatus;
pub use order_terms::{OrderType, TimeInForce};
pub use trade_type::TradeType;

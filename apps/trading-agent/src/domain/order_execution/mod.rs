//! Order Execution Bounded Context
//!
//! Orders, the executions they own, and their status lifecycle.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: owns its executions; status is derived from the executed total
//! - **Idempotent executions**: an execution ID is recorded at most once per order
//! - **Repository ports**: order persistence plus the atomic reconciliation commit

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod value_objects;

pub use aggregate::{Execution, NewOrder, Order};
pub use errors::OrderError;
pub use repository::{OrderRepository, ReconciliationStore};
pub use value_objects::{OrderStatus, OrderType, PositionAccountType, TimeInForce, TradeType};

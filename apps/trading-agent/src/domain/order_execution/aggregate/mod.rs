//! Order Aggregate
//!
//! The Order aggregate owns its executions and derives its status from them.

mod execution;
mod order;

pub use execution::Execution;
pub use order::{NewOrder, Order};

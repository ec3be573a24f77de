//! Order execution errors.

use super::value_objects::OrderStatus;

/// Errors raised by the order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// Ordered quantity is not positive.
    #[error("Invalid quantity {quantity} for order {order_id}")]
    InvalidQuantity {
        /// Order ID.
        order_id: String,
        /// Rejected quantity.
        quantity: i64,
    },

    /// Executions would exceed the ordered quantity.
    #[error("Order {order_id} over-filled: ordered {ordered}, executed {executed}")]
    Overfill {
        /// Order ID.
        order_id: String,
        /// Ordered quantity.
        ordered: i64,
        /// Executed total including the rejected execution.
        executed: i64,
    },

    /// Execution does not belong to this order.
    #[error("Execution {execution_id} does not match order {order_id}: {reason}")]
    ExecutionMismatch {
        /// Order ID.
        order_id: String,
        /// Execution ID.
        execution_id: String,
        /// What did not match.
        reason: String,
    },

    /// Order cannot be canceled in its current state.
    #[error("Order {order_id} cannot be canceled in status {status}")]
    NotCancelable {
        /// Order ID.
        order_id: String,
        /// Current status.
        status: OrderStatus,
    },
}

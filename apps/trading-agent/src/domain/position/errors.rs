//! Position integrity errors.

use crate::domain::order_execution::{PositionAccountType, TradeType};
use crate::domain::position::PositionType;

/// Execution cannot be applied to the position it targets.
///
/// Every variant is an integrity failure: the execution is not applied and no state
/// is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// Only a buy may open a position.
    #[error("No {account_type} position for {symbol} to apply {trade_type} execution against")]
    NoPositionToReduce {
        /// Symbol.
        symbol: String,
        /// Order's account type.
        account_type: PositionAccountType,
        /// Execution side.
        trade_type: TradeType,
    },

    /// A repay leg targeted a position of the wrong direction.
    #[error("{symbol}: {trade_type} {account_type} requires a {expected} position, found {actual}")]
    DirectionMismatch {
        /// Symbol.
        symbol: String,
        /// Execution side.
        trade_type: TradeType,
        /// Order's account type.
        account_type: PositionAccountType,
        /// Required direction.
        expected: PositionType,
        /// Direction on record.
        actual: PositionType,
    },

    /// Execution quantity or price is unusable.
    #[error("Invalid execution for {symbol}: {message}")]
    InvalidExecution {
        /// Symbol.
        symbol: String,
        /// Details.
        message: String,
    },
}

//! Position Bounded Context
//!
//! Holdings keyed by `(symbol, account bucket)` and the accounting rules that move
//! them when an execution arrives.

pub mod accounting;
pub mod errors;
pub mod position;
pub mod repository;

pub use accounting::{PositionChange, apply_execution};
pub use errors::PositionError;
pub use position::{Position, PositionKey, PositionType};
pub use repository::PositionRepository;

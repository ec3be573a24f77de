//! Value objects shared across the domain.

mod identifiers;
mod symbol;

pub use identifiers::{ExecutionId, OrderId};
pub use symbol::Symbol;

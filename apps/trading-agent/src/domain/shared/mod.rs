//! Shared kernel: value objects and errors used across every bounded context.

pub mod errors;
pub mod value_objects;

pub use errors::RepositoryError;
pub use value_objects::{ExecutionId, OrderId, Symbol};

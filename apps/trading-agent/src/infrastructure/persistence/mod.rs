//! Persistence Adapters
//!
//! Implementations of the order and position repository traits.

pub mod in_memory;

pub use in_memory::InMemoryRepository;

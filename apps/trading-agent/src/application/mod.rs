//! Application Layer
//!
//! The application layer orchestrates domain logic.
//! It defines:
//!
//! - **Ports**: Interfaces for interacting with external systems
//! - **State**: the shared, lock-guarded view of the account
//! - **Services**: reconciliation, decisions and the periodic tick loop

pub mod ports;
pub mod services;
pub mod state;

pub use ports::*;
pub use services::*;
pub use state::{SharedPosition, StateStore};

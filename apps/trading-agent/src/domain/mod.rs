//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: the order and the executions it owns
//! - **Entities**: positions keyed by `(symbol, account bucket)`
//! - **Pure services**: position accounting and the ATR indicator
//! - **Domain Events**: records of committed state transitions
//! - **Repository Traits**: persistence abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: order lifecycle and execution idempotency
//! - [`position`]: holdings and the accounting rules that move them
//! - [`account`]: cash balance snapshot
//! - [`market`]: daily bars and indicators

pub mod account;
pub mod events;
pub mod market;
pub mod order_execution;
pub mod position;
pub mod shared;

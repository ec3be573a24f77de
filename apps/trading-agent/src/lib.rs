// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Trading Agent - Execution Core
//!
//! Execution core of an automated equities trading agent.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: orders, executions, positions, accounting, indicators, domain events
//!   - `order_execution`: order aggregate, status lifecycle, execution idempotency
//!   - `position`: position buckets and the accounting that moves them
//!   - `market`: daily bars, ATR, strategy signals
//!
//! - **Application**: ports, shared state, services
//!   - `ports`: `TradeService`, `EventPublisherPort`, `SignalSource`
//!   - `state`: the concurrent state store
//!   - `services`: execution reconciler, decision engine, tick loop
//!
//! - **Infrastructure**: adapters
//!   - `protocol` / `dispatch`: event stream parsing, routing, ingestion
//!   - `persistence`: in-memory repositories
//!   - `backtest`: history files and the simulated trade service
//!   - `signals`: binary signal files
//!   - `events`: in-memory event publisher

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Services, state, and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Ambient
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    Execution, NewOrder, Order, OrderStatus, OrderType, PositionAccountType, TimeInForce,
    TradeType,
};
pub use domain::position::{Position, PositionKey, apply_execution};
pub use domain::shared::{ExecutionId, OrderId, Symbol};

// Application re-exports
pub use application::ports::{EventPublisherPort, SignalSource, TradeService};
pub use application::services::{
    DecisionEngine, ExecutionReconciler, StrategyParams, TickLoop, TickLoopConfig,
};
pub use application::state::StateStore;

// Infrastructure re-exports
pub use infrastructure::backtest::BacktestTradeService;
pub use infrastructure::dispatch::{Dispatcher, Ingestion};
pub use infrastructure::events::InMemoryEventPublisher;
pub use infrastructure::persistence::InMemoryRepository;
pub use infrastructure::signals::FileSignalSource;

//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Trade service**: broker or backtest simulator
//! - **Event publisher**: domain event fan-out
//! - **Signal source**: strategy signal batches

mod event_publisher_port;
mod signal_source_port;
mod trade_service_port;

pub use event_publisher_port::{
    DomainEventHandler, EventPublisherPort, NoOpEventPublisher, PublishError,
};
pub use signal_source_port::{SignalError, SignalSource};
pub use trade_service_port::{PlaceOrderRequest, TradeError, TradeService};

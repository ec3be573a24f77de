//! Domain event publishing adapters.

mod publisher;

pub use publisher::{InMemoryEventPublisher, LoggingEventHandler};

//! Event Publisher Port (Driven Port)
//!
//! Publish/subscribe contract for domain events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::events::{DomainEvent, DomainEventType};

/// Event publishing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// A subscriber returned an error.
    #[error("Event handler '{handler}' failed on {event_type}: {message}")]
    HandlerFailed {
        /// Handler name.
        handler: String,
        /// Event type being delivered.
        event_type: DomainEventType,
        /// Error details.
        message: String,
    },

    /// A subscriber task panicked or was aborted.
    #[error("Event handler task aborted on {event_type}: {message}")]
    HandlerAborted {
        /// Event type being delivered.
        event_type: DomainEventType,
        /// Join error details.
        message: String,
    },
}

/// A subscriber to domain events.
#[async_trait]
pub trait DomainEventHandler: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: &DomainEvent) -> Result<(), PublishError>;

    /// Name used in logs and errors.
    fn name(&self) -> &str;
}

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Deliver `event` to every subscriber of its type and wait for all of them.
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;

    /// Register `handler` for `event_type`.
    fn subscribe(&self, event_type: DomainEventType, handler: Arc<dyn DomainEventHandler>);

    /// Remove `handler` from `event_type`. Handlers are matched by identity.
    fn unsubscribe(&self, event_type: DomainEventType, handler: &Arc<dyn DomainEventHandler>);
}

/// No-op event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish(&self, _event: DomainEvent) -> Result<(), PublishError> {
        Ok(())
    }

    fn subscribe(&self, _event_type: DomainEventType, _handler: Arc<dyn DomainEventHandler>) {}

    fn unsubscribe(&self, _event_type: DomainEventType, _handler: &Arc<dyn DomainEventHandler>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::OrderId;

    #[tokio::test]
    async fn no_op_publisher_succeeds() {
        let publisher = NoOpEventPublisher;
        let event = DomainEvent::order_cancelled(&OrderId::new("O1"));
        assert!(publisher.publish(event).await.is_ok());
    }
}

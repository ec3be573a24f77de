//! In-memory domain event publisher.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinSet;

use crate::application::ports::{DomainEventHandler, EventPublisherPort, PublishError};
use crate::domain::events::{DomainEvent, DomainEventType};

type Subscribers = HashMap<DomainEventType, Vec<Arc<dyn DomainEventHandler>>>;

/// Fans each event out to its subscribers concurrently.
///
/// `publish` spawns one task per subscriber, waits for all of them, logs every
/// failure, and returns the first.
#[derive(Default)]
pub struct InMemoryEventPublisher {
    handlers: RwLock<Subscribers>,
}

impl InMemoryEventPublisher {
    /// Create a publisher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers for `event_type`.
    #[must_use]
    pub fn handler_count(&self, event_type: DomainEventType) -> usize {
        self.handlers.read().get(&event_type).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for InMemoryEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(event_type, list)| (event_type.as_str(), list.len()))
            .collect();
        f.debug_struct("InMemoryEventPublisher")
            .field("handlers", &counts)
            .finish()
    }
}

#[async_trait]
impl EventPublisherPort for InMemoryEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let event_type = event.event_type();
        let handlers = self.handlers.read().get(&event_type).cloned().unwrap_or_default();

        if handlers.is_empty() {
            tracing::debug!(event_type = %event_type, "No subscribers for event");
            return Ok(());
        }

        let event = Arc::new(event);
        let mut tasks = JoinSet::new();
        for handler in handlers {
            let event = Arc::clone(&event);
            tasks.spawn(async move { handler.handle(&event).await });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(PublishError::HandlerAborted {
                    event_type,
                    message: e.to_string(),
                })
            });
            if let Err(e) = result {
                tracing::error!(
                    event_type = %event_type,
                    event_id = %event.event_id(),
                    error = %e,
                    "Event handler failed"
                );
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn subscribe(&self, event_type: DomainEventType, handler: Arc<dyn DomainEventHandler>) {
        tracing::debug!(event_type = %event_type, handler = handler.name(), "Event handler subscribed");
        self.handlers.write().entry(event_type).or_default().push(handler);
    }

    fn unsubscribe(&self, event_type: DomainEventType, handler: &Arc<dyn DomainEventHandler>) {
        if let Some(list) = self.handlers.write().get_mut(&event_type) {
            list.retain(|h| !Arc::ptr_eq(h, handler));
        }
    }
}

/// Writes every event it receives to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventHandler;

impl LoggingEventHandler {
    /// Subscribe a logging handler to every event type on `publisher`.
    pub fn subscribe_all<P: EventPublisherPort + ?Sized>(publisher: &P) {
        let handler: Arc<dyn DomainEventHandler> = Arc::new(Self);
        for event_type in DomainEventType::ALL {
            publisher.subscribe(event_type, Arc::clone(&handler));
        }
    }
}

#[async_trait]
impl DomainEventHandler for LoggingEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), PublishError> {
        tracing::info!(
            event_id = %event.event_id(),
            event_type = %event.event_type(),
            aggregate_id = %event.aggregate_id(),
            occurred_at = %event.occurred_at(),
            "Domain event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

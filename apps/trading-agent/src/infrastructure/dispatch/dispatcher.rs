//! Event dispatcher: routes parsed messages to one handler per event kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::services::ReconcileError;
use crate::infrastructure::protocol::Fields;

/// Kind of a dispatchable stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Price feed (`FD`).
    Feed,
    /// Execution report (`EC`).
    Execution,
    /// Status notification (`ST`).
    Status,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [Self; 3] = [Self::Feed, Self::Execution, Self::Status];

    /// Wire command code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Feed => "FD",
            Self::Execution => "EC",
            Self::Status => "ST",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Handler failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// A required field is absent.
    #[error("{kind} event missing {field}")]
    MissingField {
        /// Event kind being decoded.
        kind: EventKind,
        /// Missing field name.
        field: &'static str,
    },

    /// A field is present but cannot be decoded.
    #[error("invalid {field} in {kind} event: {value:?} ({reason})")]
    InvalidField {
        /// Event kind being decoded.
        kind: EventKind,
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The handler was invoked for a kind it does not serve.
    #[error("{handler} does not handle {kind} events")]
    UnsupportedKind {
        /// Handler name.
        handler: &'static str,
        /// Kind it was invoked with.
        kind: EventKind,
    },

    /// Reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl HandlerError {
    /// True when the failure is an order or position integrity error.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        match self {
            Self::Reconcile(e) => e.is_integrity(),
            _ => false,
        }
    }
}

/// Handles one kind of stream event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a parsed message of `kind`.
    async fn handle(&self, kind: EventKind, fields: &Fields) -> Result<(), HandlerError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Routes events to the handler registered for their kind.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<EventKind, Arc<dyn EventHandler>>>,
}

impl Dispatcher {
    /// Create a dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaces.
    pub fn register(
        &self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> Option<Arc<dyn EventHandler>> {
        tracing::info!(event_type = %kind, handler = handler.name(), "Event handler registered");
        self.handlers.write().insert(kind, handler)
    }

    /// Remove the handler for `kind`.
    pub fn unregister(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.write().remove(&kind)
    }

    /// Whether a handler is registered for `kind`.
    #[must_use]
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    /// Dispatch `fields` to the handler for `kind`.
    ///
    /// Returns `Ok(true)` once a handler ran. An unregistered kind is logged and
    /// reported as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the handler's error unchanged.
    pub async fn dispatch(&self, kind: EventKind, fields: &Fields) -> Result<bool, HandlerError> {
        // Clone out of the lock so no guard is held across the await.
        let handler = self.handlers.read().get(&kind).cloned();

        let Some(handler) = handler else {
            tracing::warn!(event_type = %kind, "No handler registered for event type");
            return Ok(false);
        };

        tracing::debug!(event_type = %kind, handler = handler.name(), "Dispatching event");
        handler.handle(kind, fields).await?;
        Ok(true)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut kinds: Vec<_> = handlers.keys().map(EventKind::code).collect();
        kinds.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
    }
}

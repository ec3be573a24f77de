//! Execution Reconciler
//!
//! Applies one broker execution to the order it belongs to and to the position that
//! order trades against, then commits both in one store call.
//!
//! Reconciliations are serialized per symbol: an order trades exactly one symbol and
//! every position it touches is keyed by that symbol, so one lock per symbol covers the
//! `(order, position)` pair. Different symbols reconcile in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::application::ports::EventPublisherPort;
use crate::application::state::StateStore;
use crate::domain::events::DomainEvent;
use crate::domain::order_execution::{Execution, OrderError, OrderStatus, ReconciliationStore};
use crate::domain::position::{PositionChange, PositionError, PositionKey, apply_execution};
use crate::domain::shared::{RepositoryError, Symbol};

/// Reconciliation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The execution references an unknown order.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// Missing order ID.
        order_id: String,
    },

    /// The execution does not fit the order (overfill or mismatch).
    #[error("Order integrity error: {0}")]
    OrderIntegrity(#[from] OrderError),

    /// The execution does not fit the position (direction or missing position).
    #[error("Position integrity error: {0}")]
    PositionIntegrity(#[from] PositionError),

    /// The store failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ReconcileError {
    /// True for failures that need investigation rather than a retry.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(self, Self::OrderIntegrity(_) | Self::PositionIntegrity(_))
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The execution was recorded and the position moved.
    Applied {
        /// Order status after the execution.
        order_status: OrderStatus,
        /// Position change that was committed.
        change: PositionChange,
    },
    /// The execution ID was already recorded; nothing changed.
    Duplicate,
}

/// Per-symbol async locks.
#[derive(Debug, Default)]
struct SymbolLocks {
    locks: Mutex<HashMap<Symbol, Arc<tokio::sync::Mutex<()>>>>,
}

impl SymbolLocks {
    fn lock_for(&self, symbol: &Symbol) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(symbol.clone()).or_default())
    }
}

/// Reconciles executions into order and position state.
pub struct ExecutionReconciler<S, E>
where
    S: ReconciliationStore,
    E: EventPublisherPort,
{
    store: Arc<S>,
    publisher: Arc<E>,
    state: Arc<StateStore>,
    locks: SymbolLocks,
}

impl<S, E> ExecutionReconciler<S, E>
where
    S: ReconciliationStore,
    E: EventPublisherPort,
{
    /// Create a new reconciler.
    pub fn new(store: Arc<S>, publisher: Arc<E>, state: Arc<StateStore>) -> Self {
        Self {
            store,
            publisher,
            state,
            locks: SymbolLocks::default(),
        }
    }

    /// Apply `execution`.
    ///
    /// Nothing is written unless every step succeeds: the order and the position change
    /// are committed together, then mirrored into the state store. Events are published
    /// after the commit; a publish failure is logged and does not undo it.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::OrderNotFound`] if the order is unknown.
    /// - [`ReconcileError::OrderIntegrity`] on overfill or an execution that does not
    ///   match its order.
    /// - [`ReconcileError::PositionIntegrity`] if the position cannot absorb the
    ///   execution.
    /// - [`ReconcileError::Repository`] if the store fails.
    pub async fn reconcile(&self, execution: Execution) -> Result<ReconcileOutcome, ReconcileError> {
        let lock = self.locks.lock_for(&execution.symbol);
        let _guard = lock.lock().await;

        let Some(mut order) = self.store.find_by_id(&execution.order_id).await? else {
            return Err(ReconcileError::OrderNotFound {
                order_id: execution.order_id.to_string(),
            });
        };

        if !order.record_execution(execution.clone())? {
            tracing::debug!(
                order_id = %execution.order_id,
                execution_id = %execution.execution_id,
                "Duplicate execution ignored"
            );
            return Ok(ReconcileOutcome::Duplicate);
        }

        let account_type = order.account_type();
        let key = PositionKey::new(execution.symbol.clone(), account_type);
        let existing = self.store.find_by_key(&key).await?;
        let change = apply_execution(existing.as_ref(), &execution, account_type)?;

        self.store.commit(&order, &change).await?;

        self.state.apply_position_change(&change);
        self.state.add_order(order.clone());

        tracing::info!(
            order_id = %order.id(),
            execution_id = %execution.execution_id,
            symbol = %execution.symbol,
            side = %execution.trade_type,
            quantity = execution.quantity,
            price = %execution.price,
            status = %order.status(),
            position_quantity = change.position().quantity(),
            average_price = %change.position().average_price(),
            "Execution reconciled"
        );

        self.publish(DomainEvent::order_executed(&order, &execution))
            .await;
        match &change {
            PositionChange::Opened(position) => {
                self.publish(DomainEvent::position_opened(position)).await;
            }
            PositionChange::Closed {
                position,
                realized_pnl,
            } => {
                self.publish(DomainEvent::position_closed(position, *realized_pnl))
                    .await;
            }
            PositionChange::Updated(_) => {}
        }

        Ok(ReconcileOutcome::Applied {
            order_status: order.status(),
            change,
        })
    }

    async fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type();
        let aggregate_id = event.aggregate_id();
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(
                event_type = %event_type,
                aggregate_id = %aggregate_id,
                error = %e,
                "Domain event publish failed"
            );
        }
    }
}

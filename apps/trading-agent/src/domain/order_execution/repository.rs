//! Order Repository Traits
//!
//! Persistence abstractions for orders and for the atomic commit of a reconciliation.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;

use super::aggregate::Order;
use super::value_objects::OrderStatus;
use crate::domain::position::{PositionChange, PositionRepository};
use crate::domain::shared::{OrderId, RepositoryError, Symbol};

/// Repository trait for Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Find an order by its broker order ID.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Find all orders with a given status.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;

    /// All orders ever placed for a symbol, oldest first, terminal ones included.
    async fn find_order_history(&self, symbol: &Symbol) -> Result<Vec<Order>, RepositoryError>;
}

/// Store able to apply one reconciliation atomically.
///
/// `commit` writes the updated order and the position change together: readers observe
/// either both or neither.
#[async_trait]
pub trait ReconciliationStore: OrderRepository + PositionRepository {
    /// Persist `order` and apply `change` as one unit.
    async fn commit(&self, order: &Order, change: &PositionChange) -> Result<(), RepositoryError>;
}

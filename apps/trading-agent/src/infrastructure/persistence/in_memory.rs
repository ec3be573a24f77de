//! In-memory repository for orders and positions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::order_execution::{Order, OrderRepository, OrderStatus, ReconciliationStore};
use crate::domain::position::{Position, PositionChange, PositionKey, PositionRepository};
use crate::domain::shared::{OrderId, RepositoryError, Symbol};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionKey, Position>,
}

/// In-memory implementation of `OrderRepository`, `PositionRepository` and
/// `ReconciliationStore`.
///
/// Both tables sit behind one lock, so `commit` is atomic. Suitable for testing, replay
/// and backtests. Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    reject_writes: AtomicBool,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }

    /// Number of stored positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.tables.read().positions.len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let tables = self.tables.read();
        tables.orders.is_empty() && tables.positions.is_empty()
    }

    /// Remove everything.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.orders.clear();
        tables.positions.clear();
    }

    /// Add an order (for test setup).
    pub fn add_order(&self, order: Order) {
        self.tables.write().orders.insert(order.id().clone(), order);
    }

    /// Add a position (for test setup).
    pub fn add_position(&self, position: Position) {
        self.tables
            .write()
            .positions
            .insert(position.key().clone(), position);
    }

    /// Make every write fail until switched back (for failure-path tests).
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::WriteRejected {
                message: "repository is read-only".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.tables
            .write()
            .orders
            .insert(order.id().clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().orders.get(id).cloned())
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .orders
            .values()
            .filter(|o| o.status() == status)
            .cloned()
            .collect())
    }

    async fn find_order_history(&self, symbol: &Symbol) -> Result<Vec<Order>, RepositoryError> {
        let mut history: Vec<Order> = self
            .tables
            .read()
            .orders
            .values()
            .filter(|o| o.symbol() == symbol)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(history)
    }
}

#[async_trait]
impl PositionRepository for InMemoryRepository {
    async fn save_position(&self, position: &Position) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.tables
            .write()
            .positions
            .insert(position.key().clone(), position.clone());
        Ok(())
    }

    async fn find_by_key(&self, key: &PositionKey) -> Result<Option<Position>, RepositoryError> {
        Ok(self.tables.read().positions.get(key).cloned())
    }

    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Vec<Position>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .positions
            .values()
            .filter(|p| p.symbol() == symbol)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Position>, RepositoryError> {
        Ok(self.tables.read().positions.values().cloned().collect())
    }

    async fn delete_position(&self, key: &PositionKey) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.tables.write().positions.remove(key);
        Ok(())
    }

    async fn update_highest_price(
        &self,
        key: &PositionKey,
        price: Decimal,
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        if let Some(position) = self.tables.write().positions.get_mut(key) {
            position.raise_highest_price(price);
        }
        Ok(())
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryRepository {
    async fn commit(&self, order: &Order, change: &PositionChange) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut tables = self.tables.write();
        tables.orders.insert(order.id().clone(), order.clone());
        match change {
            PositionChange::Closed { position, .. } => {
                tables.positions.remove(position.key());
            }
            PositionChange::Opened(position) | PositionChange::Updated(position) => {
                tables
                    .positions
                    .insert(position.key().clone(), position.clone());
            }
        }
        Ok(())
    }
}

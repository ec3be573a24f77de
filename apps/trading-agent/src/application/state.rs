//! Concurrent State Store
//!
//! Thread-safe cache of the account as last seen: balance, positions, orders and
//! prices. Shared as `Arc<StateStore>` between the ingestion pipeline and the tick loop.
//!
//! # Aliasing
//!
//! [`StateStore::get_positions`] and [`StateStore::get_orders`] return a fresh `Vec`,
//! but its entries are shared handles to the stored values. A targeted update such as
//! [`StateStore::update_position_highest_price`] writes through the shared
//! [`SharedPosition`], so a caller holding a previously fetched handle sees the new
//! value. A full replace ([`StateStore::update_positions`]) installs new handles; old
//! handles keep the values they had.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::account::Balance;
use crate::domain::order_execution::{Order, TradeType};
use crate::domain::position::{Position, PositionChange, PositionKey};
use crate::domain::shared::{OrderId, Symbol};

/// Handle to a stored position, shared with the store.
pub type SharedPosition = Arc<RwLock<Position>>;

/// In-memory account state.
///
/// Each facet sits behind its own reader/writer lock. Full-replace updates build the new
/// collection first and swap it in under the write lock, so readers never observe a
/// half-replaced collection.
#[derive(Debug, Default)]
pub struct StateStore {
    balance: RwLock<Balance>,
    positions: RwLock<HashMap<PositionKey, SharedPosition>>,
    orders: RwLock<HashMap<OrderId, Arc<Order>>>,
    prices: RwLock<HashMap<Symbol, Decimal>>,
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Balance
    // ========================================================================

    /// Copy of the current balance.
    #[must_use]
    pub fn get_balance(&self) -> Balance {
        *self.balance.read()
    }

    /// Overwrite the balance.
    pub fn update_balance(&self, balance: Balance) {
        *self.balance.write() = balance;
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// All positions. The `Vec` is new; its entries alias the stored positions.
    #[must_use]
    pub fn get_positions(&self) -> Vec<SharedPosition> {
        self.positions.read().values().cloned().collect()
    }

    /// Replace every position with `positions`. Keys absent from the snapshot disappear.
    pub fn update_positions(&self, positions: Vec<Position>) {
        let replacement: HashMap<PositionKey, SharedPosition> = positions
            .into_iter()
            .map(|p| (p.key().clone(), Arc::new(RwLock::new(p))))
            .collect();
        *self.positions.write() = replacement;
    }

    /// Position stored under `key`.
    #[must_use]
    pub fn get_position(&self, key: &PositionKey) -> Option<SharedPosition> {
        self.positions.read().get(key).cloned()
    }

    /// Positions held in `symbol` across all account buckets.
    #[must_use]
    pub fn positions_for_symbol(&self, symbol: &Symbol) -> Vec<SharedPosition> {
        self.positions
            .read()
            .iter()
            .filter(|(key, _)| &key.symbol == symbol)
            .map(|(_, position)| Arc::clone(position))
            .collect()
    }

    /// True if any position is held in `symbol`.
    #[must_use]
    pub fn has_position(&self, symbol: &Symbol) -> bool {
        self.positions.read().keys().any(|key| &key.symbol == symbol)
    }

    /// Raise the highest price of the position under `key`. Returns true if it moved.
    pub fn update_position_highest_price(&self, key: &PositionKey, price: Decimal) -> bool {
        self.get_position(key)
            .is_some_and(|position| position.write().raise_highest_price(price))
    }

    /// Set the trailing stop of the position under `key`. Returns false if absent.
    pub fn update_position_trailing_stop_price(&self, key: &PositionKey, price: Decimal) -> bool {
        match self.get_position(key) {
            Some(position) => {
                position.write().set_trailing_stop_price(price);
                true
            }
            None => false,
        }
    }

    /// Apply a committed reconciliation to the cached positions.
    pub fn apply_position_change(&self, change: &PositionChange) {
        let mut positions = self.positions.write();
        match change {
            PositionChange::Closed { position, .. } => {
                positions.remove(position.key());
            }
            PositionChange::Opened(position) | PositionChange::Updated(position) => {
                match positions.get(position.key()) {
                    Some(existing) => *existing.write() = position.clone(),
                    None => {
                        positions.insert(
                            position.key().clone(),
                            Arc::new(RwLock::new(position.clone())),
                        );
                    }
                }
            }
        }
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// All orders. The `Vec` is new; its entries alias the stored orders.
    #[must_use]
    pub fn get_orders(&self) -> Vec<Arc<Order>> {
        self.orders.read().values().cloned().collect()
    }

    /// Replace every order with `orders`.
    pub fn update_orders(&self, orders: Vec<Order>) {
        let replacement: HashMap<OrderId, Arc<Order>> = orders
            .into_iter()
            .map(|o| (o.id().clone(), Arc::new(o)))
            .collect();
        *self.orders.write() = replacement;
    }

    /// Order by ID.
    #[must_use]
    pub fn get_order(&self, order_id: &OrderId) -> Option<Arc<Order>> {
        self.orders.read().get(order_id).cloned()
    }

    /// Insert or replace a single order.
    pub fn add_order(&self, order: Order) {
        self.orders
            .write()
            .insert(order.id().clone(), Arc::new(order));
    }

    /// True if an order in `symbol` is still open, optionally restricted to one side.
    #[must_use]
    pub fn has_unexecuted_order(&self, symbol: &Symbol, side: Option<TradeType>) -> bool {
        self.orders.read().values().any(|order| {
            order.symbol() == symbol
                && order.is_unexecuted()
                && side.is_none_or(|side| order.trade_type() == side)
        })
    }

    // ========================================================================
    // Prices
    // ========================================================================

    /// Record the latest price for `symbol`.
    pub fn update_price(&self, symbol: Symbol, price: Decimal) {
        self.prices.write().insert(symbol, price);
    }

    /// Latest price for `symbol`.
    #[must_use]
    pub fn get_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.read().get(symbol).copied()
    }
}

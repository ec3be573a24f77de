//! Position Repository Trait

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::position::{Position, PositionKey};
use crate::domain::shared::{RepositoryError, Symbol};

/// Repository trait for Position persistence.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Save a position (insert or update).
    async fn save_position(&self, position: &Position) -> Result<(), RepositoryError>;

    /// Find a position by identity.
    async fn find_by_key(&self, key: &PositionKey) -> Result<Option<Position>, RepositoryError>;

    /// All positions held for a symbol, across buckets.
    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Vec<Position>, RepositoryError>;

    /// All open positions.
    async fn find_all(&self) -> Result<Vec<Position>, RepositoryError>;

    /// Delete a position. Deleting a missing position is not an error.
    async fn delete_position(&self, key: &PositionKey) -> Result<(), RepositoryError>;

    /// Raise the recorded highest price; lower values are ignored.
    async fn update_highest_price(
        &self,
        key: &PositionKey,
        price: Decimal,
    ) -> Result<(), RepositoryError>;
}

use async_trait::async_trait;
use common::ProductId;

use crate::{Result, StockLevel, Version};

/// Core trait for inventory store implementations.
///
/// The store holds one counter per product. All implementations must be
/// thread-safe (Send + Sync), and `conditional_decrement` must be atomic
/// with respect to the read-then-write of a single product's counter:
/// no two concurrent callers may both observe sufficient stock and both
/// decrement past zero.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the current stock level for a product.
    ///
    /// Fails with `NotFound` if the product has no stock record.
    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel>;

    /// Atomically decrements a product's counter by `amount`, provided the
    /// counter is still at `expected_version` and holds at least `amount`
    /// units.
    ///
    /// Decrementing to exactly zero is allowed; requesting more than is
    /// available fails with `InsufficientStock` and is never clamped. If
    /// another writer got in between, fails with `VersionMismatch` and the
    /// caller should re-read and retry.
    ///
    /// Returns the post-decrement stock level.
    async fn conditional_decrement(
        &self,
        product_id: &ProductId,
        amount: u32,
        expected_version: Version,
    ) -> Result<StockLevel>;

    /// Increments a product's counter by `amount`.
    ///
    /// This is the compensating write used to undo a decrement after a
    /// later step of the same commit fails, and the restocking write for
    /// cancelled or returned orders. It bumps the version like any other
    /// write.
    async fn increment(&self, product_id: &ProductId, amount: u32) -> Result<StockLevel>;

    /// Creates or replaces a product's stock record with the given count.
    ///
    /// Seeding belongs to catalog management; it lives on the trait so
    /// operators and tests can provision stock through the same interface.
    async fn set_stock(&self, product_id: &ProductId, count: u32) -> Result<StockLevel>;
}

/// Extension trait providing convenience methods for inventory stores.
#[async_trait]
pub trait InventoryStoreExt: InventoryStore {
    /// Checks if a product has a stock record.
    async fn product_stocked(&self, product_id: &ProductId) -> Result<bool> {
        match self.get_stock(product_id).await {
            Ok(_) => Ok(true),
            Err(crate::InventoryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all InventoryStore implementations
impl<T: InventoryStore + ?Sized> InventoryStoreExt for T {}

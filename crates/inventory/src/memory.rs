use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::{InventoryError, InventoryStore, Result, StockLevel, Version};

/// In-memory inventory store implementation for testing.
///
/// This implementation stores all counters in memory and provides the same
/// interface as the PostgreSQL implementation. The check and the mutate of
/// `conditional_decrement` happen under a single write lock, which makes
/// per-product decrements linearizable.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    levels: Arc<RwLock<HashMap<ProductId, StockLevel>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of products with a stock record.
    pub async fn product_count(&self) -> usize {
        self.levels.read().await.len()
    }

    /// Clears all stock records.
    pub async fn clear(&self) {
        self.levels.write().await.clear();
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel> {
        let levels = self.levels.read().await;
        levels
            .get(product_id)
            .copied()
            .ok_or_else(|| InventoryError::NotFound(product_id.clone()))
    }

    async fn conditional_decrement(
        &self,
        product_id: &ProductId,
        amount: u32,
        expected_version: Version,
    ) -> Result<StockLevel> {
        let mut levels = self.levels.write().await;

        let level = levels
            .get_mut(product_id)
            .ok_or_else(|| InventoryError::NotFound(product_id.clone()))?;

        if level.version != expected_version {
            return Err(InventoryError::VersionMismatch {
                product_id: product_id.clone(),
                expected: expected_version,
                actual: level.version,
            });
        }

        if level.count_in_stock < amount {
            return Err(InventoryError::InsufficientStock {
                product_id: product_id.clone(),
                requested: amount,
                available: level.count_in_stock,
            });
        }

        level.count_in_stock -= amount;
        level.version = level.version.next();
        metrics::counter!("inventory_decrements_total").increment(1);

        Ok(*level)
    }

    async fn increment(&self, product_id: &ProductId, amount: u32) -> Result<StockLevel> {
        let mut levels = self.levels.write().await;

        let level = levels
            .get_mut(product_id)
            .ok_or_else(|| InventoryError::NotFound(product_id.clone()))?;

        // Saturate at the counter bound rather than wrapping
        level.count_in_stock = level.count_in_stock.saturating_add(amount);
        level.version = level.version.next();
        metrics::counter!("inventory_increments_total").increment(1);

        Ok(*level)
    }

    async fn set_stock(&self, product_id: &ProductId, count: u32) -> Result<StockLevel> {
        let mut levels = self.levels.write().await;

        let level = levels
            .entry(product_id.clone())
            .and_modify(|l| {
                l.count_in_stock = count;
                l.version = l.version.next();
            })
            .or_insert_with(|| StockLevel::new(count, Version::first()));

        Ok(*level)
    }
}

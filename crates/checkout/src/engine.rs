//! All-or-nothing reservation over the inventory store.

use common::ProductId;
use inventory::{InventoryError, InventoryStore, Version};

use crate::demand::{Demand, DemandSet};
use crate::error::ReservationError;

/// How many times a single product's decrement is retried after losing a
/// version race before the whole batch is rejected as a transient conflict.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// A successfully applied decrement, kept for audit logging and as the
/// compensation record if a later step fails.
#[derive(Debug, Clone)]
pub struct CommittedLine {
    /// The product that was decremented.
    pub product_id: ProductId,

    /// Units taken from stock.
    pub quantity: u32,

    /// Units remaining after the decrement.
    pub remaining: u32,

    /// Counter version after the decrement.
    pub version: Version,
}

/// Reserves stock for a batch of demands, all-or-nothing.
///
/// Demands arrive pre-sorted by product id (a [`DemandSet`] invariant), so
/// every concurrent commit mutates products in the same global order and
/// lock-ordering deadlocks cannot arise. If any product rejects, every
/// decrement already applied in the batch is compensated before the
/// rejection is returned.
pub struct ReservationEngine<S> {
    store: S,
    retry_budget: u32,
}

impl<S> ReservationEngine<S>
where
    S: InventoryStore + Clone + Send + Sync + 'static,
{
    /// Creates an engine with the default retry budget.
    pub fn new(store: S) -> Self {
        Self::with_retry_budget(store, DEFAULT_RETRY_BUDGET)
    }

    /// Creates an engine with an explicit retry budget.
    pub fn with_retry_budget(store: S, retry_budget: u32) -> Self {
        Self {
            store,
            retry_budget: retry_budget.max(1),
        }
    }

    /// Returns a reference to the underlying inventory store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Atomically reserves every demand in the set, or nothing.
    ///
    /// Returns the per-product post-decrement state on success. On any
    /// rejection, previously applied decrements have already been reversed
    /// when the error is returned.
    #[tracing::instrument(skip(self, demands), fields(demand_count = demands.len()))]
    pub async fn reserve(
        &self,
        demands: &DemandSet,
    ) -> Result<Vec<CommittedLine>, ReservationError> {
        metrics::counter!("reservation_attempts_total").increment(1);
        let mut committed: Vec<CommittedLine> = Vec::with_capacity(demands.len());

        for demand in demands.iter() {
            match self.decrement_with_retry(demand).await {
                Ok(line) => committed.push(line),
                Err(e) => {
                    tracing::warn!(
                        product_id = %demand.product_id,
                        error = %e,
                        "reservation rejected, compensating applied decrements"
                    );
                    self.release(
                        committed
                            .iter()
                            .map(|l| (l.product_id.clone(), l.quantity))
                            .collect(),
                    )
                    .await;
                    metrics::counter!("reservation_rejections_total").increment(1);
                    return Err(e);
                }
            }
        }

        metrics::counter!("reservations_committed_total").increment(1);
        Ok(committed)
    }

    /// Applies compensating increments for previously decremented lines,
    /// in reverse order.
    ///
    /// Runs on a spawned task so a cancelled caller cannot abandon the
    /// compensation halfway. Increment failures are logged and the
    /// remaining lines are still released.
    pub async fn release(&self, lines: Vec<(ProductId, u32)>) {
        if lines.is_empty() {
            return;
        }

        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            for (product_id, quantity) in lines.iter().rev() {
                match store.increment(product_id, *quantity).await {
                    Ok(level) => {
                        tracing::debug!(
                            %product_id,
                            quantity,
                            count_in_stock = level.count_in_stock,
                            "compensating increment applied"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            %product_id,
                            quantity,
                            error = %e,
                            "compensating increment failed"
                        );
                    }
                }
            }
            metrics::counter!("reservation_compensations_total").increment(1);
        });

        // The task finishes even if this await is cancelled.
        let _ = handle.await;
    }

    /// Decrements one product, retrying lost version races within budget.
    async fn decrement_with_retry(&self, demand: &Demand) -> Result<CommittedLine, ReservationError> {
        let mut attempts = 0;
        loop {
            let level = match self.store.get_stock(&demand.product_id).await {
                Ok(level) => level,
                Err(InventoryError::NotFound(product_id)) => {
                    return Err(ReservationError::ProductNotFound(product_id));
                }
                Err(e) => return Err(ReservationError::Store(e)),
            };

            if !level.can_satisfy(demand.quantity) {
                return Err(ReservationError::InsufficientStock {
                    product_id: demand.product_id.clone(),
                    requested: demand.quantity,
                    available: level.count_in_stock,
                });
            }

            match self
                .store
                .conditional_decrement(&demand.product_id, demand.quantity, level.version)
                .await
            {
                Ok(after) => {
                    return Ok(CommittedLine {
                        product_id: demand.product_id.clone(),
                        quantity: demand.quantity,
                        remaining: after.count_in_stock,
                        version: after.version,
                    });
                }
                Err(InventoryError::VersionMismatch { .. }) => {
                    attempts += 1;
                    if attempts >= self.retry_budget {
                        return Err(ReservationError::TransientConflict {
                            product_id: demand.product_id.clone(),
                            attempts,
                        });
                    }
                    tracing::debug!(
                        product_id = %demand.product_id,
                        attempts,
                        "lost version race, retrying decrement"
                    );
                }
                Err(InventoryError::NotFound(product_id)) => {
                    return Err(ReservationError::ProductNotFound(product_id));
                }
                Err(InventoryError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                }) => {
                    return Err(ReservationError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    });
                }
                Err(e) => return Err(ReservationError::Store(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inventory::{InMemoryInventoryStore, StockLevel};

    fn pid(s: &str) -> ProductId {
        ProductId::new(s)
    }

    /// Store wrapper whose contested product always loses the version
    /// race, as if another writer slipped in between every read and
    /// decrement.
    #[derive(Clone)]
    struct ContestedStore {
        inner: InMemoryInventoryStore,
        contested: ProductId,
    }

    #[async_trait]
    impl InventoryStore for ContestedStore {
        async fn get_stock(&self, product_id: &ProductId) -> inventory::Result<StockLevel> {
            self.inner.get_stock(product_id).await
        }

        async fn conditional_decrement(
            &self,
            product_id: &ProductId,
            amount: u32,
            expected_version: Version,
        ) -> inventory::Result<StockLevel> {
            if *product_id == self.contested {
                return Err(InventoryError::VersionMismatch {
                    product_id: product_id.clone(),
                    expected: expected_version,
                    actual: expected_version.next(),
                });
            }
            self.inner
                .conditional_decrement(product_id, amount, expected_version)
                .await
        }

        async fn increment(&self, product_id: &ProductId, amount: u32) -> inventory::Result<StockLevel> {
            self.inner.increment(product_id, amount).await
        }

        async fn set_stock(&self, product_id: &ProductId, count: u32) -> inventory::Result<StockLevel> {
            self.inner.set_stock(product_id, count).await
        }
    }

    async fn seeded_store(entries: &[(&str, u32)]) -> InMemoryInventoryStore {
        let store = InMemoryInventoryStore::new();
        for (id, count) in entries {
            store.set_stock(&pid(id), *count).await.unwrap();
        }
        store
    }

    fn demands(pairs: &[(&str, u32)]) -> DemandSet {
        DemandSet::new(pairs.iter().map(|(id, q)| (pid(id), *q)).collect()).unwrap()
    }

    #[tokio::test]
    async fn reserve_commits_every_demand() {
        let store = seeded_store(&[("SKU-A", 5), ("SKU-B", 3)]).await;
        let engine = ReservationEngine::new(store.clone());

        let committed = engine
            .reserve(&demands(&[("SKU-A", 2), ("SKU-B", 1)]))
            .await
            .unwrap();
        assert_eq!(committed.len(), 2);

        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 3);
        assert_eq!(store.get_stock(&pid("SKU-B")).await.unwrap().count_in_stock, 2);
    }

    #[tokio::test]
    async fn committed_lines_report_post_decrement_state() {
        let store = seeded_store(&[("SKU-A", 5)]).await;
        let engine = ReservationEngine::new(store);

        let committed = engine.reserve(&demands(&[("SKU-A", 2)])).await.unwrap();
        assert_eq!(committed[0].quantity, 2);
        assert_eq!(committed[0].remaining, 3);
    }

    #[tokio::test]
    async fn rejection_rolls_back_applied_decrements() {
        // Third product (by sort order) is out of stock
        let store = seeded_store(&[("SKU-A", 5), ("SKU-B", 5), ("SKU-C", 0)]).await;
        let engine = ReservationEngine::new(store.clone());

        let result = engine
            .reserve(&demands(&[("SKU-A", 1), ("SKU-B", 1), ("SKU-C", 1)]))
            .await;
        assert!(matches!(
            result,
            Err(ReservationError::InsufficientStock { .. })
        ));

        // Products 1-2 retain their original stock
        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 5);
        assert_eq!(store.get_stock(&pid("SKU-B")).await.unwrap().count_in_stock, 5);
    }

    #[tokio::test]
    async fn unknown_product_aborts_batch() {
        let store = seeded_store(&[("SKU-A", 5)]).await;
        let engine = ReservationEngine::new(store.clone());

        let result = engine
            .reserve(&demands(&[("SKU-A", 1), ("SKU-Z", 1)]))
            .await;
        match result {
            Err(ReservationError::ProductNotFound(product_id)) => {
                assert_eq!(product_id, pid("SKU-Z"));
            }
            other => panic!("expected ProductNotFound, got {:?}", other),
        }
        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 5);
    }

    #[tokio::test]
    async fn exact_remaining_stock_is_allowed() {
        let store = seeded_store(&[("SKU-A", 1)]).await;
        let engine = ReservationEngine::new(store.clone());

        engine.reserve(&demands(&[("SKU-A", 1)])).await.unwrap();
        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 0);

        // And the now-empty counter rejects further demands
        let result = engine.reserve(&demands(&[("SKU-A", 1)])).await;
        match result {
            Err(ReservationError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn version_race_is_retried() {
        let store = seeded_store(&[("SKU-A", 10)]).await;
        let engine = ReservationEngine::new(store.clone());

        // Interleave a foreign write to invalidate the engine's first read.
        // The engine should re-read and still succeed within budget.
        let racer = store.clone();
        let race = tokio::spawn(async move {
            for _ in 0..3 {
                let _ = racer.increment(&pid("SKU-A"), 0).await;
                tokio::task::yield_now().await;
            }
        });

        let committed = engine.reserve(&demands(&[("SKU-A", 2)])).await.unwrap();
        race.await.unwrap();
        assert_eq!(committed[0].quantity, 2);
    }

    #[tokio::test]
    async fn exhausted_retry_budget_rejects_and_compensates() {
        let inner = seeded_store(&[("SKU-A", 5), ("SKU-B", 5)]).await;
        let store = ContestedStore {
            inner: inner.clone(),
            contested: pid("SKU-B"),
        };
        let engine = ReservationEngine::with_retry_budget(store, 2);

        // SKU-A decrements first, then SKU-B burns the whole budget
        let result = engine
            .reserve(&demands(&[("SKU-A", 2), ("SKU-B", 1)]))
            .await;
        match result {
            Err(ReservationError::TransientConflict {
                product_id,
                attempts,
            }) => {
                assert_eq!(product_id, pid("SKU-B"));
                assert_eq!(attempts, 2);
            }
            other => panic!("expected TransientConflict, got {:?}", other),
        }

        // SKU-A's decrement was compensated before the rejection surfaced
        assert_eq!(inner.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 5);
        assert_eq!(inner.get_stock(&pid("SKU-B")).await.unwrap().count_in_stock, 5);
    }

    #[tokio::test]
    async fn release_restores_counts() {
        let store = seeded_store(&[("SKU-A", 5), ("SKU-B", 5)]).await;
        let engine = ReservationEngine::new(store.clone());

        let committed = engine
            .reserve(&demands(&[("SKU-A", 2), ("SKU-B", 3)]))
            .await
            .unwrap();
        engine
            .release(
                committed
                    .iter()
                    .map(|l| (l.product_id.clone(), l.quantity))
                    .collect(),
            )
            .await;

        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 5);
        assert_eq!(store.get_stock(&pid("SKU-B")).await.unwrap().count_in_stock, 5);
    }

    #[tokio::test]
    async fn contending_batches_never_oversell() {
        let store = seeded_store(&[("SKU-A", 10)]).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            // Generous budget so only real shortfalls reject
            let engine = ReservationEngine::with_retry_budget(store.clone(), 100);
            handles.push(tokio::spawn(async move {
                engine.reserve(&demands(&[("SKU-A", 1)])).await.is_ok()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 10);
        assert_eq!(store.get_stock(&pid("SKU-A")).await.unwrap().count_in_stock, 0);
    }
}

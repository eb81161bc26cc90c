//! Order commit coordinator.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use common::{OrderId, ProductId, UserId};
use inventory::InventoryStore;
use ledger::{LedgerError, OrderLedger, OrderLine, OrderRecord, OrderStatus};
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::config::CheckoutConfig;
use crate::demand::{Demand, DemandSet};
use crate::engine::ReservationEngine;
use crate::error::CommitError;

/// A commit request as handed over by the caller (e.g. an HTTP layer).
///
/// `user_id` is already authenticated by the identity layer and is trusted
/// as-is. The demands are raw pairs; validation happens exactly once, at
/// the start of the commit.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The authenticated user placing the order.
    pub user_id: UserId,

    /// Raw (product, quantity) pairs from the cart.
    pub demands: Vec<(ProductId, u32)>,

    /// Optional client-supplied token making retries of the same logical
    /// request take effect only once.
    pub idempotency_key: Option<String>,
}

impl CommitRequest {
    /// Creates a commit request without an idempotency key.
    pub fn new(user_id: UserId, demands: Vec<(ProductId, u32)>) -> Self {
        Self {
            user_id,
            demands,
            idempotency_key: None,
        }
    }

    /// Attaches an idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// How many committed idempotency keys are retained for replay detection
/// before the oldest are evicted.
pub const DEFAULT_IDEMPOTENCY_CAPACITY: usize = 10_000;

enum KeyState {
    InFlight { fingerprint: Vec<Demand> },
    Committed { fingerprint: Vec<Demand>, order_id: OrderId },
}

enum KeyClaim {
    Fresh,
    Replay(OrderId),
}

/// Idempotency keys with insertion-ordered eviction of committed entries.
///
/// In-flight markers are never evicted; they are removed when their
/// attempt settles. A replay of an evicted key executes as a fresh
/// commit.
#[derive(Default)]
struct KeyTable {
    entries: HashMap<String, KeyState>,
    committed: VecDeque<String>,
}

/// Orchestrates a commit attempt end to end: Validating -> Reserving ->
/// Persisting -> Committed.
///
/// On a ledger failure after stock was reserved, the reservation is fully
/// released before the error surfaces; a reservation with no corresponding
/// order would be a stock leak. Status transitions of committed orders run
/// through [`CommitCoordinator::transition_status`], which restocks on
/// cancellation or return.
pub struct CommitCoordinator<S, L, C>
where
    S: InventoryStore + Clone + Send + Sync + 'static,
    L: OrderLedger,
    C: Catalog,
{
    engine: ReservationEngine<S>,
    ledger: L,
    catalog: C,
    idempotency: Arc<RwLock<KeyTable>>,
    idempotency_capacity: usize,
}

impl<S, L, C> CommitCoordinator<S, L, C>
where
    S: InventoryStore + Clone + Send + Sync + 'static,
    L: OrderLedger,
    C: Catalog,
{
    /// Creates a coordinator with default configuration.
    pub fn new(store: S, ledger: L, catalog: C) -> Self {
        Self::with_config(store, ledger, catalog, CheckoutConfig::default())
    }

    /// Creates a coordinator with explicit configuration.
    pub fn with_config(store: S, ledger: L, catalog: C, config: CheckoutConfig) -> Self {
        Self {
            engine: ReservationEngine::with_retry_budget(store, config.retry_budget),
            ledger,
            catalog,
            idempotency: Arc::new(RwLock::new(KeyTable::default())),
            idempotency_capacity: config.idempotency_capacity.max(1),
        }
    }

    /// Returns a reference to the reservation engine.
    pub fn engine(&self) -> &ReservationEngine<S> {
        &self.engine
    }

    /// Commits an order: validates the demands, reserves stock and appends
    /// the order to the ledger.
    ///
    /// Repeating a commit with the same idempotency key and the same
    /// demand set returns the originally committed order without touching
    /// stock again.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn commit(&self, request: CommitRequest) -> Result<OrderRecord, CommitError> {
        metrics::counter!("order_commits_total").increment(1);
        let start = std::time::Instant::now();

        // Validating
        let demands = DemandSet::new(request.demands.clone())?;

        if let Some(key) = &request.idempotency_key
            && let KeyClaim::Replay(order_id) = self.claim_key(key, &demands).await?
        {
            tracing::info!(%order_id, key, "idempotent replay, returning committed order");
            return self
                .ledger
                .get(order_id)
                .await?
                .ok_or(CommitError::OrderNotFound(order_id));
        }

        let outcome = self.reserve_and_persist(request.user_id, &demands).await;

        if let Some(key) = &request.idempotency_key {
            match &outcome {
                Ok(order) => self.mark_committed(key, order.order_id()).await,
                Err(_) => self.release_key(key).await,
            }
        }

        metrics::histogram!("order_commit_duration_seconds").record(start.elapsed().as_secs_f64());
        match &outcome {
            Ok(order) => {
                metrics::counter!("order_commits_committed").increment(1);
                tracing::info!(
                    order_id = %order.order_id(),
                    total = %order.total_price(),
                    "order committed"
                );
            }
            Err(e) => {
                metrics::counter!("order_commits_rejected").increment(1);
                tracing::warn!(error = %e, "order commit rejected");
            }
        }
        outcome
    }

    /// Moves a committed order to a new status.
    ///
    /// Restricted to an authorized caller role at the boundary above this
    /// one. Entering `Cancelled` or `Returned` restocks the originally
    /// reserved quantities.
    ///
    /// The status write is compare-and-set against the status this method
    /// observed, so concurrent transitions of the same order race on the
    /// ledger and exactly one wins. Only the winner restocks; a loser
    /// re-reads and re-decides against the status the winner left behind.
    #[tracing::instrument(skip(self))]
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderRecord, CommitError> {
        loop {
            let order = self
                .ledger
                .get(order_id)
                .await?
                .ok_or(CommitError::OrderNotFound(order_id))?;
            let from = order.status();

            if !from.can_transition_to(new_status) {
                return Err(CommitError::InvalidStatusTransition {
                    from,
                    to: new_status,
                });
            }

            let updated = match self.ledger.update_status(order_id, from, new_status).await {
                Ok(updated) => updated,
                Err(LedgerError::StatusConflict { actual, .. }) => {
                    tracing::debug!(
                        %order_id,
                        observed = %from,
                        actual = %actual,
                        "lost status race, re-reading"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if new_status.releases_stock() {
                let lines = updated
                    .lines()
                    .iter()
                    .map(|l| (l.product_id.clone(), l.quantity))
                    .collect();
                self.engine.release(lines).await;
                metrics::counter!("order_restocks_total").increment(1);
                tracing::info!(%order_id, status = %new_status, "order restocked");
            }

            return Ok(updated);
        }
    }

    /// Returns all orders placed by a user, newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>, CommitError> {
        Ok(self.ledger.orders_for_user(user_id).await?)
    }

    /// Returns all orders, newest first.
    pub async fn all_orders(&self) -> Result<Vec<OrderRecord>, CommitError> {
        Ok(self.ledger.all_orders().await?)
    }

    /// Reserving and Persisting, with compensation on a failed append.
    async fn reserve_and_persist(
        &self,
        user_id: UserId,
        demands: &DemandSet,
    ) -> Result<OrderRecord, CommitError> {
        // Snapshot name, price and image from the catalog. The total is
        // recomputed from these, never taken from the caller.
        let mut lines = Vec::with_capacity(demands.len());
        for demand in demands.iter() {
            let info = self
                .catalog
                .product_info(&demand.product_id)
                .await
                .ok_or_else(|| CommitError::ProductNotFound(demand.product_id.clone()))?;
            lines.push(OrderLine::new(
                demand.product_id.clone(),
                info.name,
                demand.quantity,
                info.price,
                info.image,
            ));
        }

        let committed = self.engine.reserve(demands).await?;

        let order = OrderRecord::new(user_id, lines);
        if let Err(e) = self.ledger.append(order.clone()).await {
            tracing::error!(
                order_id = %order.order_id(),
                error = %e,
                "ledger append failed after reservation, releasing stock"
            );
            self.engine
                .release(
                    committed
                        .iter()
                        .map(|l| (l.product_id.clone(), l.quantity))
                        .collect(),
                )
                .await;
            metrics::counter!("order_commit_compensations_total").increment(1);
            return Err(CommitError::Ledger(e));
        }

        Ok(order)
    }

    /// Claims an idempotency key, or reports what it already holds.
    async fn claim_key(&self, key: &str, demands: &DemandSet) -> Result<KeyClaim, CommitError> {
        let mut table = self.idempotency.write().await;
        match table.entries.get(key) {
            Some(KeyState::Committed {
                fingerprint,
                order_id,
            }) => {
                if fingerprint.as_slice() == demands.as_slice() {
                    Ok(KeyClaim::Replay(*order_id))
                } else {
                    Err(CommitError::IdempotencyMismatch {
                        key: key.to_string(),
                    })
                }
            }
            Some(KeyState::InFlight { fingerprint }) => {
                if fingerprint.as_slice() == demands.as_slice() {
                    Err(CommitError::CommitInFlight(key.to_string()))
                } else {
                    Err(CommitError::IdempotencyMismatch {
                        key: key.to_string(),
                    })
                }
            }
            None => {
                table.entries.insert(
                    key.to_string(),
                    KeyState::InFlight {
                        fingerprint: demands.as_slice().to_vec(),
                    },
                );
                Ok(KeyClaim::Fresh)
            }
        }
    }

    async fn mark_committed(&self, key: &str, order_id: OrderId) {
        let mut table = self.idempotency.write().await;
        if let Some(KeyState::InFlight { fingerprint }) = table.entries.remove(key) {
            table.entries.insert(
                key.to_string(),
                KeyState::Committed {
                    fingerprint,
                    order_id,
                },
            );
            table.committed.push_back(key.to_string());

            // Bound the table: drop the oldest committed keys. A key that
            // was reclaimed and is in flight again stays.
            while table.committed.len() > self.idempotency_capacity {
                if let Some(oldest) = table.committed.pop_front()
                    && matches!(table.entries.get(&oldest), Some(KeyState::Committed { .. }))
                {
                    table.entries.remove(&oldest);
                }
            }
        }
    }

    /// A failed attempt frees the key so the caller can retry.
    async fn release_key(&self, key: &str) {
        let mut table = self.idempotency.write().await;
        if matches!(table.entries.get(key), Some(KeyState::InFlight { .. })) {
            table.entries.remove(key);
        }
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use tokio::sync::RwLock;

use crate::{LedgerError, OrderLedger, OrderRecord, OrderStatus, Result};

#[derive(Default)]
struct LedgerState {
    orders: HashMap<OrderId, OrderRecord>,
    fail_on_append: bool,
}

/// In-memory order ledger implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation, plus a
/// fault-injection switch so the coordinator's compensation path can be
/// exercised.
#[derive(Clone, Default)]
pub struct InMemoryOrderLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryOrderLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to fail on the next append call.
    pub async fn set_fail_on_append(&self, fail: bool) {
        self.state.write().await.fail_on_append = fail;
    }

    /// Returns the number of orders in the ledger.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderLedger for InMemoryOrderLedger {
    async fn append(&self, order: OrderRecord) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_append {
            return Err(LedgerError::Database(sqlx::Error::PoolClosed));
        }

        if state.orders.contains_key(&order.order_id()) {
            return Err(LedgerError::DuplicateOrder(order.order_id()));
        }

        state.orders.insert(order.order_id(), order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderRecord> {
        let mut state = self.state.write().await;

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;

        // Check and write under the same lock, same as the guarded UPDATE
        // in the PostgreSQL implementation.
        if order.status != from {
            return Err(LedgerError::StatusConflict {
                order_id,
                expected: from,
                actual: order.status,
            });
        }

        order.status = to;
        Ok(order.clone())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}

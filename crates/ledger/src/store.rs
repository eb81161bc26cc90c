use async_trait::async_trait;
use common::{OrderId, UserId};

use crate::{OrderRecord, OrderStatus, Result};

/// Core trait for order ledger implementations.
///
/// The ledger is append-only: a record is written once by the commit
/// coordinator and afterwards only its status may change, through the
/// guarded `update_status`. The ledger itself is policy-free; whether a
/// status transition is legal is decided by the caller. The guard exists
/// so that two concurrent transitions of the same order cannot both win.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Appends a committed order.
    ///
    /// Fails with `DuplicateOrder` if an order with the same ID already
    /// exists.
    async fn append(&self, order: OrderRecord) -> Result<()>;

    /// Retrieves an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Moves an order from an expected status to a new one and returns
    /// the updated record.
    ///
    /// This is the only permitted mutation of a committed order. The
    /// update is compare-and-set: it fails with `StatusConflict` when the
    /// stored status no longer matches `from`, so exactly one of any set
    /// of concurrent transitions out of the same status can succeed.
    async fn update_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderRecord>;

    /// Returns all orders placed by a user, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>>;

    /// Returns all orders in the ledger, newest first.
    async fn all_orders(&self) -> Result<Vec<OrderRecord>>;
}

use common::OrderId;
use thiserror::Error;

use crate::status::{OrderStatus, ParseStatusError};

/// Errors that can occur when interacting with the order ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No order with this ID has been committed.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this ID has already been appended.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A guarded status update lost to a concurrent transition: the
    /// stored status no longer matches the one the caller observed.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A stored status string could not be parsed.
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for order ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

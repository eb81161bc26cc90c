use common::ProductId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The product has no stock record.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The counter was written by someone else between read and write.
    /// The expected version did not match the actual version.
    #[error("Version mismatch for product {product_id}: expected {expected}, found {actual}")]
    VersionMismatch {
        product_id: ProductId,
        expected: Version,
        actual: Version,
    },

    /// The requested decrement would take the counter below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for inventory store operations.
pub type Result<T> = std::result::Result<T, InventoryError>;

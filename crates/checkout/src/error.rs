//! Checkout error taxonomy.
//!
//! Storage-layer errors are caught and classified at the engine and
//! coordinator boundary; nothing below it is exposed raw to callers.

use common::{OrderId, ProductId};
use inventory::InventoryError;
use ledger::{LedgerError, OrderStatus};
use thiserror::Error;

/// Errors raised while validating a demand batch, before any storage is
/// touched. Fully recoverable by the caller correcting the input.
#[derive(Debug, Error)]
pub enum DemandError {
    /// The demand batch contained no items.
    #[error("No order items")]
    Empty,

    /// A demand requested zero units.
    #[error("Invalid quantity for product {product_id} (must be greater than 0)")]
    NonPositiveQuantity { product_id: ProductId },

    /// A demand, after merging duplicates, exceeds the per-product
    /// maximum.
    #[error("Quantity for product {product_id} exceeds the per-product maximum")]
    QuantityTooLarge { product_id: ProductId },
}

/// Errors raised by the reservation engine. A rejection always means no
/// partial decrement survived: every applied decrement was compensated
/// before the error was returned.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// A demanded product has no stock record.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A demanded product has fewer units than requested.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The retry budget was exhausted under contention. The whole commit
    /// may safely be retried.
    #[error("Transient conflict on product {product_id} after {attempts} attempts")]
    TransientConflict { product_id: ProductId, attempts: u32 },

    /// An unclassified inventory store failure.
    #[error("Inventory store error: {0}")]
    Store(#[source] InventoryError),
}

/// Errors surfaced by the commit coordinator.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The request was malformed; nothing was reserved or persisted.
    #[error(transparent)]
    Validation(#[from] DemandError),

    /// A demanded product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A demanded product has fewer units than requested.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Contention on a product exhausted the retry budget; the commit may
    /// safely be retried since no partial state survived.
    #[error("Transient conflict on product {product_id}; retry the commit")]
    TransientConflict { product_id: ProductId },

    /// The idempotency key was seen before with a different demand set.
    #[error("Idempotency key {key} was already used with different demands")]
    IdempotencyMismatch { key: String },

    /// Another commit with the same idempotency key is still running.
    #[error("A commit with idempotency key {0} is already in flight")]
    CommitInFlight(String),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested status change is not allowed by the order lifecycle.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The ledger write failed. If stock had been reserved, it was
    /// released before this error surfaced.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// An unclassified inventory store failure.
    #[error("Inventory store error: {0}")]
    Inventory(#[source] InventoryError),
}

impl From<ReservationError> for CommitError {
    fn from(e: ReservationError) -> Self {
        match e {
            ReservationError::ProductNotFound(product_id) => {
                CommitError::ProductNotFound(product_id)
            }
            ReservationError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CommitError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            ReservationError::TransientConflict { product_id, .. } => {
                CommitError::TransientConflict { product_id }
            }
            ReservationError::Store(e) => CommitError::Inventory(e),
        }
    }
}

/// Convenience type alias for commit results.
pub type Result<T> = std::result::Result<T, CommitError>;

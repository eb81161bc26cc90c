//! Inventory store: durable per-product stock counters.
//!
//! The store exposes exactly one mutation primitive that matters for
//! correctness: [`InventoryStore::conditional_decrement`], a version-guarded
//! check-and-decrement that is atomic with respect to concurrent callers.
//! Stock can never be observed below zero, and no two callers can both
//! decrement past the remaining count.

pub mod error;
pub mod level;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::ProductId;
pub use error::{InventoryError, Result};
pub use level::{StockLevel, Version};
pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use store::InventoryStore;

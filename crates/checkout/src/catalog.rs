//! Read-only catalog interface consumed by the commit coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, ProductId};
use tokio::sync::RwLock;

/// Catalog data snapshotted into an order line at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    /// Product name for display.
    pub name: String,

    /// Authoritative per-unit price. Client-supplied totals are ignored.
    pub price: Money,

    /// Product image reference, if any.
    pub image: Option<String>,
}

impl ProductInfo {
    /// Creates a new product info snapshot.
    pub fn new(name: impl Into<String>, price: Money, image: Option<String>) -> Self {
        Self {
            name: name.into(),
            price,
            image,
        }
    }
}

/// Trait for read-only catalog lookups.
///
/// The catalog itself is owned elsewhere; the coordinator only reads
/// names and prices from it while validating a commit request.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the catalog entry for a product, or None if it doesn't exist.
    async fn product_info(&self, product_id: &ProductId) -> Option<ProductInfo>;

    /// Returns true if the product exists in the catalog.
    async fn product_exists(&self, product_id: &ProductId) -> bool {
        self.product_info(product_id).await.is_some()
    }
}

/// In-memory catalog for testing and wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductInfo>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog entry.
    pub async fn insert(&self, product_id: impl Into<ProductId>, info: ProductInfo) {
        self.products.write().await.insert(product_id.into(), info);
    }

    /// Returns the number of catalog entries.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product_info(&self, product_id: &ProductId) -> Option<ProductInfo> {
        self.products.read().await.get(product_id).cloned()
    }
}

use async_trait::async_trait;
use common::ProductId;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{InventoryError, InventoryStore, Result, StockLevel, Version};

/// PostgreSQL-backed inventory store implementation.
///
/// The check and the decrement are a single guarded UPDATE, so the
/// atomicity requirement holds across processes, not just within one.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_level(row: PgRow) -> Result<StockLevel> {
        Ok(StockLevel {
            count_in_stock: row.try_get::<i32, _>("count_in_stock")? as u32,
            version: Version::new(row.try_get("version")?),
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel> {
        let row = sqlx::query(
            r#"
            SELECT count_in_stock, version
            FROM inventory
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_level(row),
            None => Err(InventoryError::NotFound(product_id.clone())),
        }
    }

    async fn conditional_decrement(
        &self,
        product_id: &ProductId,
        amount: u32,
        expected_version: Version,
    ) -> Result<StockLevel> {
        let row = sqlx::query(
            r#"
            UPDATE inventory
            SET count_in_stock = count_in_stock - $2, version = version + 1
            WHERE product_id = $1 AND version = $3 AND count_in_stock >= $2
            RETURNING count_in_stock, version
            "#,
        )
        .bind(product_id.as_str())
        // i64 bind: amounts past i32::MAX surface as range errors instead
        // of wrapping
        .bind(i64::from(amount))
        .bind(expected_version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            metrics::counter!("inventory_decrements_total").increment(1);
            return Self::row_to_level(row);
        }

        // Zero rows: re-read once to classify the failure.
        let current = self.get_stock(product_id).await?;
        tracing::debug!(
            %product_id,
            expected = %expected_version,
            actual = %current.version,
            available = current.count_in_stock,
            "guarded decrement rejected"
        );
        if current.version != expected_version {
            Err(InventoryError::VersionMismatch {
                product_id: product_id.clone(),
                expected: expected_version,
                actual: current.version,
            })
        } else {
            Err(InventoryError::InsufficientStock {
                product_id: product_id.clone(),
                requested: amount,
                available: current.count_in_stock,
            })
        }
    }

    async fn increment(&self, product_id: &ProductId, amount: u32) -> Result<StockLevel> {
        let row = sqlx::query(
            r#"
            UPDATE inventory
            SET count_in_stock = count_in_stock + $2, version = version + 1
            WHERE product_id = $1
            RETURNING count_in_stock, version
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(amount))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                metrics::counter!("inventory_increments_total").increment(1);
                Self::row_to_level(row)
            }
            None => Err(InventoryError::NotFound(product_id.clone())),
        }
    }

    async fn set_stock(&self, product_id: &ProductId, count: u32) -> Result<StockLevel> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (product_id, count_in_stock, version)
            VALUES ($1, $2, 1)
            ON CONFLICT (product_id)
            DO UPDATE SET count_in_stock = EXCLUDED.count_in_stock,
                          version = inventory.version + 1
            RETURNING count_in_stock, version
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(count))
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_level(row)
    }
}

use async_trait::async_trait;
use common::{Money, OrderId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{LedgerError, OrderLedger, OrderLine, OrderRecord, OrderStatus, Result};

/// PostgreSQL-backed order ledger implementation.
///
/// Line items are stored as a JSONB snapshot alongside the derived total,
/// status and timestamp columns.
#[derive(Clone)]
pub struct PostgresOrderLedger {
    pool: PgPool,
}

impl PostgresOrderLedger {
    /// Creates a new PostgreSQL order ledger.
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

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<OrderLine> = serde_json::from_value(lines_json)?;
        let status: OrderStatus = row.try_get::<String, _>("status")?.parse()?;

        Ok(OrderRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            lines,
            total_price: Money::from_cents(row.try_get("total_cents")?),
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl OrderLedger for PostgresOrderLedger {
    async fn append(&self, order: OrderRecord) -> Result<()> {
        let lines_json = serde_json::to_value(order.lines())?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, lines, total_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.order_id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(lines_json)
        .bind(order.total_price().cents())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Primary-key violation means the order ID was already used
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return LedgerError::DuplicateOrder(order.order_id());
            }
            LedgerError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, user_id, lines, total_cents, status, created_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderRecord> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3
            WHERE order_id = $1 AND status = $2
            RETURNING order_id, user_id, lines, total_cents, status, created_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_order(row);
        }

        // Zero rows: re-read to tell a missing order from a lost race.
        match self.get(order_id).await? {
            Some(order) => Err(LedgerError::StatusConflict {
                order_id,
                expected: from,
                actual: order.status(),
            }),
            None => Err(LedgerError::OrderNotFound(order_id)),
        }
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, user_id, lines, total_cents, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn all_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, user_id, lines, total_cents, status, created_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

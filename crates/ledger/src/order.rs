//! Order records and line items.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::OrderStatus;

/// A single line of a committed order.
///
/// Name and price are copied from the catalog at commit time, not
/// referenced live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product this line reserves.
    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub name: String,

    /// Units purchased.
    pub quantity: u32,

    /// Per-unit price at the time of purchase.
    pub unit_price: Money,

    /// Product image reference at the time of purchase, if any.
    pub image: Option<String>,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        image: Option<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_price,
            image,
        }
    }

    /// Returns `quantity * unit_price` for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A committed order as recorded in the ledger.
///
/// The total price is derived from the line items at construction time and
/// is never accepted from callers. After append, only the status field
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub(crate) order_id: OrderId,
    pub(crate) user_id: UserId,
    pub(crate) lines: Vec<OrderLine>,
    pub(crate) total_price: Money,
    pub(crate) status: OrderStatus,
    pub(crate) created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Creates a new pending order with a generated ID and a derived total.
    pub fn new(user_id: UserId, lines: Vec<OrderLine>) -> Self {
        let total_price = lines.iter().map(OrderLine::line_total).sum();
        Self {
            order_id: OrderId::new(),
            user_id,
            lines,
            total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Returns the order ID.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Returns the user who placed the order.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the line items.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the line for a product, if present.
    pub fn line_for(&self, product_id: &ProductId) -> Option<&OrderLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Returns the derived total price.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the commit timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

//! Order ledger: durable, append-only records of committed orders.
//!
//! A row is written once at commit time and never mutated afterwards,
//! with one exception: its status, which moves through the
//! [`OrderStatus`] state machine via an authorized transition operation.
//! Line items snapshot name and price at commit time, so later catalog
//! changes never retroactively alter a placed order.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod status;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::OrderLedger;
pub use memory::InMemoryOrderLedger;
pub use order::{OrderLine, OrderRecord};
pub use postgres::PostgresOrderLedger;
pub use status::OrderStatus;

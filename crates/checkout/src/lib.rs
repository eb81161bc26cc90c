//! Order commit: all-or-nothing inventory reservation plus ledger append.
//!
//! The [`ReservationEngine`] walks a validated [`DemandSet`] in a fixed
//! product order, decrementing each counter with a version guard and
//! compensating every applied decrement if any product rejects. The
//! [`CommitCoordinator`] drives a commit attempt end to end:
//!
//! 1. Validate the request and snapshot prices from the catalog
//! 2. Reserve stock through the engine
//! 3. Append the order to the ledger
//!
//! A failure after stock was reserved always releases the reservation
//! before the error surfaces; partial decrements never outlive a rejected
//! commit.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod demand;
pub mod engine;
pub mod error;

pub use catalog::{Catalog, InMemoryCatalog, ProductInfo};
pub use config::CheckoutConfig;
pub use coordinator::{CommitCoordinator, CommitRequest, DEFAULT_IDEMPOTENCY_CAPACITY};
pub use demand::{Demand, DemandSet, MAX_LINE_QUANTITY};
pub use engine::{CommittedLine, DEFAULT_RETRY_BUDGET, ReservationEngine};
pub use error::{CommitError, DemandError, ReservationError};

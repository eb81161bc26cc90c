//! Shared value types used across the order-commit system.

pub mod ids;
pub mod money;

pub use ids::{OrderId, ProductId, UserId};
pub use money::Money;

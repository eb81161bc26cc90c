//! Checkout configuration loaded from environment variables.

use crate::coordinator::DEFAULT_IDEMPOTENCY_CAPACITY;
use crate::engine::DEFAULT_RETRY_BUDGET;

/// Checkout tuning knobs with sensible defaults.
///
/// Reads from environment variables:
/// - `RESERVE_RETRY_BUDGET` — max decrement retries per product after a
///   lost version race (default: `5`)
/// - `IDEMPOTENCY_CAPACITY` — committed idempotency keys retained for
///   replay detection before the oldest are evicted (default: `10000`)
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub retry_budget: u32,
    pub idempotency_capacity: usize,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            retry_budget: std::env::var("RESERVE_RETRY_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_BUDGET),
            idempotency_capacity: std::env::var("IDEMPOTENCY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_IDEMPOTENCY_CAPACITY),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            idempotency_capacity: DEFAULT_IDEMPOTENCY_CAPACITY,
        }
    }
}

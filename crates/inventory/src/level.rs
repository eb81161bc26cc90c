//! Stock level and version types.

use serde::{Deserialize, Serialize};

/// Version number for a product's stock counter, used for optimistic
/// concurrency control.
///
/// Versions start at 1 when a product is first seeded and increment by 1
/// on every successful write, including compensating increments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a product that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) assigned when a product is seeded.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A point-in-time observation of a product's stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Units currently in stock. Never negative.
    pub count_in_stock: u32,

    /// Version of the counter at the time of observation.
    pub version: Version,
}

impl StockLevel {
    /// Creates a new stock level.
    pub fn new(count_in_stock: u32, version: Version) -> Self {
        Self {
            count_in_stock,
            version,
        }
    }

    /// Returns true if at least `amount` units are in stock.
    pub fn can_satisfy(&self, amount: u32) -> bool {
        self.count_in_stock >= amount
    }
}

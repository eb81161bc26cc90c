//! Validated reservation demands.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::DemandError;

/// Upper bound on the units a single commit may demand of one product,
/// applied after duplicate merging.
pub const MAX_LINE_QUANTITY: u32 = 1_000_000;

/// A single (product, quantity) demand within one commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    /// The product to reserve.
    pub product_id: ProductId,

    /// Units requested. Always positive.
    pub quantity: u32,
}

/// A validated, request-scoped batch of demands.
///
/// Construction is the single validation point: empty batches, zero
/// quantities and quantities past [`MAX_LINE_QUANTITY`] are rejected,
/// duplicate product ids are merged by summing their quantities, and the
/// result is sorted by product id. The sort
/// gives every commit attempt the same global mutation order, which is
/// what makes lock-ordering deadlocks impossible. Downstream code never
/// re-validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandSet {
    demands: Vec<Demand>,
}

impl DemandSet {
    /// Validates and normalizes raw (product, quantity) pairs.
    pub fn new(pairs: Vec<(ProductId, u32)>) -> Result<Self, DemandError> {
        if pairs.is_empty() {
            return Err(DemandError::Empty);
        }

        let mut demands: Vec<Demand> = Vec::with_capacity(pairs.len());
        for (product_id, quantity) in pairs {
            if quantity == 0 {
                return Err(DemandError::NonPositiveQuantity { product_id });
            }
            match demands.iter_mut().find(|d| d.product_id == product_id) {
                // checked_add: the merged total must stay within the
                // bound, never wrap
                Some(existing) => match existing.quantity.checked_add(quantity) {
                    Some(merged) if merged <= MAX_LINE_QUANTITY => existing.quantity = merged,
                    _ => return Err(DemandError::QuantityTooLarge { product_id }),
                },
                None if quantity > MAX_LINE_QUANTITY => {
                    return Err(DemandError::QuantityTooLarge { product_id });
                }
                None => demands.push(Demand {
                    product_id,
                    quantity,
                }),
            }
        }

        demands.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(Self { demands })
    }

    /// Returns the demands in product-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Demand> {
        self.demands.iter()
    }

    /// Returns the number of distinct products demanded.
    pub fn len(&self) -> usize {
        self.demands.len()
    }

    /// Always false: empty sets cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Returns the normalized demands, used as the idempotency fingerprint.
    pub fn as_slice(&self) -> &[Demand] {
        &self.demands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s)
    }

    #[test]
    fn empty_batch_is_rejected() {
        let result = DemandSet::new(vec![]);
        assert!(matches!(result, Err(DemandError::Empty)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let result = DemandSet::new(vec![(pid("SKU-001"), 2), (pid("SKU-002"), 0)]);
        match result {
            Err(DemandError::NonPositiveQuantity { product_id }) => {
                assert_eq!(product_id, pid("SKU-002"));
            }
            other => panic!("expected NonPositiveQuantity, got {:?}", other),
        }
    }

    #[test]
    fn demands_are_sorted_by_product_id() {
        let set = DemandSet::new(vec![(pid("SKU-B"), 1), (pid("SKU-A"), 2)]).unwrap();
        let ids: Vec<_> = set.iter().map(|d| d.product_id.as_str()).collect();
        assert_eq!(ids, vec!["SKU-A", "SKU-B"]);
    }

    #[test]
    fn duplicates_are_merged() {
        let set = DemandSet::new(vec![
            (pid("SKU-A"), 1),
            (pid("SKU-B"), 2),
            (pid("SKU-A"), 3),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        let a = set.iter().find(|d| d.product_id == pid("SKU-A")).unwrap();
        assert_eq!(a.quantity, 4);
    }

    #[test]
    fn quantity_at_the_maximum_is_allowed() {
        let set = DemandSet::new(vec![(pid("SKU-A"), MAX_LINE_QUANTITY)]).unwrap();
        assert_eq!(set.as_slice()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn quantity_above_the_maximum_is_rejected() {
        let result = DemandSet::new(vec![(pid("SKU-A"), MAX_LINE_QUANTITY + 1)]);
        assert!(matches!(result, Err(DemandError::QuantityTooLarge { .. })));
    }

    #[test]
    fn merged_duplicates_cannot_exceed_the_maximum() {
        let result = DemandSet::new(vec![
            (pid("SKU-A"), MAX_LINE_QUANTITY),
            (pid("SKU-A"), 1),
        ]);
        match result {
            Err(DemandError::QuantityTooLarge { product_id }) => {
                assert_eq!(product_id, pid("SKU-A"));
            }
            other => panic!("expected QuantityTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn same_demands_in_any_order_normalize_identically() {
        let ab = DemandSet::new(vec![(pid("SKU-A"), 1), (pid("SKU-B"), 2)]).unwrap();
        let ba = DemandSet::new(vec![(pid("SKU-B"), 2), (pid("SKU-A"), 1)]).unwrap();
        assert_eq!(ab, ba);
    }
}

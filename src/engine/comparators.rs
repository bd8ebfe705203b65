// ============================================================================
// Order Comparators
// Price-time and volume-priority ranking for the four heaps
// ============================================================================

use crate::domain::{ComparatorType, PriorityKey, Side};
use crate::interfaces::OrderComparator;
use std::cmp::Ordering;
use std::sync::Arc;

/// Better price first: higher for bids, lower for asks
fn price_advantage(a: &PriorityKey, b: &PriorityKey) -> Ordering {
    debug_assert_eq!(a.side, b.side);
    match a.side {
        Side::Bid => b.price.cmp(&a.price),
        Side::Ask => a.price.cmp(&b.price),
    }
}

/// Larger quantity first
fn size_advantage(a: &PriorityKey, b: &PriorityKey) -> Ordering {
    b.quantity.cmp(&a.quantity)
}

/// Earlier timestamp first
fn time_advantage(a: &PriorityKey, b: &PriorityKey) -> Ordering {
    a.timestamp.cmp(&b.timestamp)
}

/// Default ranking: price, then size, then time
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTimeComparator;

impl OrderComparator for PriceTimeComparator {
    fn compare(&self, a: &PriorityKey, b: &PriorityKey) -> Ordering {
        price_advantage(a, b)
            .then_with(|| size_advantage(a, b))
            .then_with(|| time_advantage(a, b))
    }

    fn name(&self) -> &str {
        "PriceTime"
    }
}

/// Size-first ranking: size, then price, then time
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumePriorityComparator;

impl OrderComparator for VolumePriorityComparator {
    fn compare(&self, a: &PriorityKey, b: &PriorityKey) -> Ordering {
        size_advantage(a, b)
            .then_with(|| price_advantage(a, b))
            .then_with(|| time_advantage(a, b))
    }

    fn name(&self) -> &str {
        "VolumePriority"
    }
}

/// Comparator instance for a configured type
pub fn comparator_for(kind: ComparatorType) -> Arc<dyn OrderComparator> {
    match kind {
        ComparatorType::PriceTime => Arc::new(PriceTimeComparator),
        ComparatorType::VolumePriority => Arc::new(VolumePriorityComparator),
    }
}

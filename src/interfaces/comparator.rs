// ============================================================================
// Order Comparator Interface
// Pluggable ranking of orders inside a heap
// ============================================================================

use crate::domain::PriorityKey;
use std::cmp::Ordering;

/// Strategy pattern interface for order priority
/// Implementations: PriceTime (default), VolumePriority
pub trait OrderComparator: Send + Sync {
    /// Rank two same-side keys. `Less` means `a` has priority over `b`.
    ///
    /// Must be total over the key fields so heap behaviour is deterministic.
    fn compare(&self, a: &PriorityKey, b: &PriorityKey) -> Ordering;

    /// Get the comparator name for logging
    fn name(&self) -> &str;
}

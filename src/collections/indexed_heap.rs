// ============================================================================
// Indexed Binary Heap
// Priority queue over copyable handles with removal by identity
// ============================================================================

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Ranks two keys. `Less` means the first key sits closer to the top.
pub type HeapOrdering<K> = Box<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Binary heap whose entries are `(item, key)` pairs.
///
/// Items are handles into storage owned elsewhere (an arena slot, an id) and
/// must be unique within the heap. A position map makes `remove` and
/// `contains` cheap, which a `std::collections::BinaryHeap` cannot offer.
pub struct IndexedHeap<T, K> {
    entries: Vec<(T, K)>,
    positions: HashMap<T, usize>,
    ordering: HeapOrdering<K>,
}

impl<T, K> IndexedHeap<T, K>
where
    T: Copy + Eq + Hash,
{
    pub fn new(ordering: HeapOrdering<K>) -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            ordering,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Insert `item` ranked by `key`.
    ///
    /// Returns false and leaves the heap untouched if `item` is already present.
    pub fn push(&mut self, item: T, key: K) -> bool {
        if self.positions.contains_key(&item) {
            return false;
        }

        let index = self.entries.len();
        self.entries.push((item, key));
        self.positions.insert(item, index);
        self.sift_up(index);
        true
    }

    /// The top item, if any
    pub fn peek(&self) -> Option<T> {
        self.entries.first().map(|(item, _)| *item)
    }

    pub fn peek_key(&self) -> Option<&K> {
        self.entries.first().map(|(_, key)| key)
    }

    pub fn pop(&mut self) -> Option<(T, K)> {
        if self.entries.is_empty() {
            return None;
        }
        self.remove_at(0)
    }

    /// Remove `item` wherever it sits, returning its key.
    pub fn remove(&mut self, item: &T) -> Option<K> {
        let index = *self.positions.get(item)?;
        self.remove_at(index).map(|(_, key)| key)
    }

    /// Entries in heap-array order, not priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &K)> + '_ {
        self.entries.iter().map(|(item, key)| (item, key))
    }

    /// Items from top to bottom without disturbing the heap.
    pub fn sorted(&self) -> Vec<T> {
        let mut refs: Vec<&(T, K)> = self.entries.iter().collect();
        refs.sort_by(|a, b| (self.ordering)(&a.1, &b.1));
        refs.into_iter().map(|(item, _)| *item).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn remove_at(&mut self, index: usize) -> Option<(T, K)> {
        let last = self.entries.len().checked_sub(1)?;
        self.swap(index, last);

        let (item, key) = self.entries.pop()?;
        self.positions.remove(&item);

        if index < self.entries.len() {
            // The moved entry may belong above or below its new slot
            self.sift_down(index);
            self.sift_up(index);
        }

        Some((item, key))
    }

    fn higher(&self, a: usize, b: usize) -> bool {
        (self.ordering)(&self.entries[a].1, &self.entries[b].1) == Ordering::Less
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.higher(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;

            if left < len && self.higher(left, best) {
                best = left;
            }
            if right < len && self.higher(right, best) {
                best = right;
            }
            if best == index {
                break;
            }

            self.swap(index, best);
            index = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        self.positions.insert(self.entries[a].0, a);
        self.positions.insert(self.entries[b].0, b);
    }
}

impl<T: fmt::Debug, K: fmt::Debug> fmt::Debug for IndexedHeap<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHeap")
            .field("entries", &self.entries)
            .finish()
    }
}

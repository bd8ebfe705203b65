// ============================================================================
// Collections Module
// Arena-friendly containers used by the order books
// ============================================================================

mod indexed_heap;

pub use indexed_heap::{HeapOrdering, IndexedHeap};

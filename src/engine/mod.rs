// ============================================================================
// Engine Module
// Contains the four-heap book, its comparators and the auctioneer
// ============================================================================

mod auctioneer;
mod four_heap;
mod tick_book;

pub mod comparators;
pub mod factory;

pub use auctioneer::Auctioneer;
pub use comparators::{comparator_for, PriceTimeComparator, VolumePriorityComparator};
pub use factory::{create_from_config, AuctioneerBuilder};
pub use four_heap::FourHeapOrderBook;
pub use tick_book::TickOrderBook;

// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod acceptance_policy;
mod comparator;
mod event_handler;
mod order_book;
mod pricing_policy;
mod timing_condition;

pub use acceptance_policy::{Acceptance, AcceptancePolicy};
pub use comparator::OrderComparator;
pub use event_handler::{
    EventHandler, LoggingEventHandler, MarketEvent, NoOpEventHandler, RecordingEventHandler,
};
pub use order_book::OrderBook;
pub use pricing_policy::PricingPolicy;
pub use timing_condition::{MarketTrigger, TimingCondition, TimingContext};

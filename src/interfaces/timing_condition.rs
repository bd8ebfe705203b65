// ============================================================================
// Timing Condition Interface
// Predicates deciding when to clear, end a day or close the auction
// ============================================================================

use crate::domain::AuctionClock;

/// What prompted a timing condition to be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketTrigger {
    /// An order was accepted into the book
    OrderPlaced,
    /// A trading round finished
    RoundClosed,
    /// A trading day finished
    DayClosed,
    /// The driver asked directly
    Explicit,
}

/// State handed to every condition evaluation
#[derive(Debug, Clone, Copy)]
pub struct TimingContext<'a> {
    pub clock: &'a AuctionClock,
    pub trigger: MarketTrigger,
}

impl<'a> TimingContext<'a> {
    pub fn new(clock: &'a AuctionClock, trigger: MarketTrigger) -> Self {
        Self { clock, trigger }
    }
}

/// Boolean predicate over auction time
pub trait TimingCondition: Send {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool;

    /// Get the condition name for logging
    fn name(&self) -> &str;
}

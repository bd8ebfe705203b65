// ============================================================================
// Order Book Interface
// Defines the contract shared by the four-heap book and its decorators
// ============================================================================

use crate::domain::{FragmentChain, MarketError, MarketQuote, MatchedPair, Order, OrderFragment, OrderId};
use crate::numeric::Quantity;

/// An order book partitioned into matched and unmatched bids and asks.
///
/// "Matched" fragments would transact if the book cleared now. Every
/// implementation keeps matched bid volume equal to matched ask volume after
/// each public call returns.
pub trait OrderBook: Send + Sync {
    /// Insert an order and re-match.
    ///
    /// # Errors
    /// `DuplicateOrder` if an order with the same id is still live.
    fn add(&mut self, order: Order) -> Result<(), MarketError>;

    /// Cancel the remaining chain of an order and re-match.
    ///
    /// Returns the cancelled volume, or `None` when the order is not live.
    /// Cancelling twice is a no-op the second time.
    fn remove(&mut self, order_id: OrderId) -> Option<Quantity>;

    /// Harvest every matched pair, best matched bid first.
    ///
    /// Harvested fragments are marked filled. Unmatched fragments stay put.
    fn match_orders(&mut self) -> Vec<MatchedPair>;

    /// The pairs `match_orders` would harvest, in the same order, leaving
    /// the book untouched.
    fn matched_pairs(&self) -> Vec<MatchedPair>;

    /// Drop every order
    fn reset(&mut self);

    /// Best bid that would not trade now
    fn highest_unmatched_bid(&self) -> Option<&OrderFragment>;

    /// Worst bid that would trade now
    fn lowest_matched_bid(&self) -> Option<&OrderFragment>;

    /// Best ask that would not trade now
    fn lowest_unmatched_ask(&self) -> Option<&OrderFragment>;

    /// Worst ask that would trade now
    fn highest_matched_ask(&self) -> Option<&OrderFragment>;

    /// Four-heap quote: `ask = min(s_out, b_in)` and `bid = max(b_out, s_in)`
    fn quote(&self) -> MarketQuote {
        let ask = [self.lowest_unmatched_ask(), self.lowest_matched_bid()]
            .into_iter()
            .flatten()
            .map(|f| f.price())
            .min();
        let bid = [self.highest_unmatched_bid(), self.highest_matched_ask()]
            .into_iter()
            .flatten()
            .map(|f| f.price())
            .max();

        MarketQuote::new(bid, ask)
    }

    fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Fragments held across all four heaps
    fn depth(&self) -> usize;

    /// Matched bid volume, equal to matched ask volume
    fn matched_volume(&self) -> u64;

    /// Unmatched bids in priority order
    fn unmatched_bids(&self) -> Vec<&OrderFragment>;

    /// Unmatched asks in priority order
    fn unmatched_asks(&self) -> Vec<&OrderFragment>;

    /// Every live bid fragment, matched or not, in no particular order
    fn bids(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_>;

    /// Every live ask fragment, matched or not, in no particular order
    fn asks(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_>;

    /// Fragment chain of a live order
    fn chain(&self, order_id: OrderId) -> Option<FragmentChain<'_>>;

    fn contains(&self, order_id: OrderId) -> bool;

    /// Panic if matched volumes differ or a matched pair is malformed.
    fn check_balanced(&self);

    /// True when all four crossing inequalities hold.
    fn check_invariants(&self) -> bool;

    /// Get the book name for logging
    fn name(&self) -> &str;
}

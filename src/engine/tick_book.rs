// ============================================================================
// Tick Order Book
// Decorator that snaps incoming prices to a fixed number of decimals
// ============================================================================

use crate::domain::{FragmentChain, MarketError, MarketQuote, MatchedPair, Order, OrderFragment, OrderId};
use crate::engine::FourHeapOrderBook;
use crate::interfaces::OrderBook;
use crate::numeric::Quantity;
use tracing::trace;

/// Rounds every order's price to `tick_decimals` places before it enters
/// the wrapped book. Everything else is delegated unchanged.
///
/// # Example
/// ```
/// use double_auction::prelude::*;
/// use double_auction::numeric::Price;
///
/// let mut book = TickOrderBook::new(FourHeapOrderBook::new(), 4);
/// let order = Order::bid(AgentId(1), Price::from_f64_with_exponent(0.123456, 6).unwrap(), 1).unwrap();
/// book.add(order).unwrap();
/// assert_eq!(book.highest_unmatched_bid().unwrap().price().to_string(), "0.123500");
/// ```
#[derive(Debug)]
pub struct TickOrderBook<B: OrderBook = FourHeapOrderBook> {
    inner: B,
    tick_decimals: u8,
}

impl<B: OrderBook> TickOrderBook<B> {
    pub fn new(inner: B, tick_decimals: u8) -> Self {
        Self {
            inner,
            tick_decimals,
        }
    }

    pub fn tick_decimals(&self) -> u8 {
        self.tick_decimals
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: OrderBook> OrderBook for TickOrderBook<B> {
    fn add(&mut self, order: Order) -> Result<(), MarketError> {
        let rounded = order.price().round_to_decimals(self.tick_decimals)?;
        if rounded != order.price() {
            trace!(
                order_id = %order.id(),
                from = %order.price(),
                to = %rounded,
                "price rounded to tick"
            );
        }
        self.inner.add(order.with_price(rounded))
    }

    fn remove(&mut self, order_id: OrderId) -> Option<Quantity> {
        self.inner.remove(order_id)
    }

    fn match_orders(&mut self) -> Vec<MatchedPair> {
        self.inner.match_orders()
    }

    fn matched_pairs(&self) -> Vec<MatchedPair> {
        self.inner.matched_pairs()
    }

    fn reset(&mut self) {
        self.inner.reset()
    }

    fn highest_unmatched_bid(&self) -> Option<&OrderFragment> {
        self.inner.highest_unmatched_bid()
    }

    fn lowest_matched_bid(&self) -> Option<&OrderFragment> {
        self.inner.lowest_matched_bid()
    }

    fn lowest_unmatched_ask(&self) -> Option<&OrderFragment> {
        self.inner.lowest_unmatched_ask()
    }

    fn highest_matched_ask(&self) -> Option<&OrderFragment> {
        self.inner.highest_matched_ask()
    }

    fn quote(&self) -> MarketQuote {
        self.inner.quote()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn depth(&self) -> usize {
        self.inner.depth()
    }

    fn matched_volume(&self) -> u64 {
        self.inner.matched_volume()
    }

    fn unmatched_bids(&self) -> Vec<&OrderFragment> {
        self.inner.unmatched_bids()
    }

    fn unmatched_asks(&self) -> Vec<&OrderFragment> {
        self.inner.unmatched_asks()
    }

    fn bids(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_> {
        self.inner.bids()
    }

    fn asks(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_> {
        self.inner.asks()
    }

    fn chain(&self, order_id: OrderId) -> Option<FragmentChain<'_>> {
        self.inner.chain(order_id)
    }

    fn contains(&self, order_id: OrderId) -> bool {
        self.inner.contains(order_id)
    }

    fn check_balanced(&self) {
        self.inner.check_balanced()
    }

    fn check_invariants(&self) -> bool {
        self.inner.check_invariants()
    }

    fn name(&self) -> &str {
        "Tick"
    }
}

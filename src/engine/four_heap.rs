// ============================================================================
// Four-Heap Order Book
// Incremental double-auction book that always knows which orders would trade
// ============================================================================

use crate::collections::IndexedHeap;
use crate::domain::{
    AgentId, FragmentChain, FragmentId, MarketError, MatchedPair, Order, OrderFragment, OrderId,
    PriorityKey, Side,
};
use crate::engine::comparators::PriceTimeComparator;
use crate::interfaces::{OrderBook, OrderComparator};
use crate::numeric::{Price, Quantity};
use slab::Slab;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// Arena Slots
// ============================================================================

/// Which heap currently holds a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    BidOut,
    BidIn,
    AskOut,
    AskIn,
    /// Popped for rearrangement, about to be pushed again
    Detached,
    /// Harvested by `match_orders`
    Filled,
}

impl Location {
    fn unmatched(side: Side) -> Self {
        match side {
            Side::Bid => Location::BidOut,
            Side::Ask => Location::AskOut,
        }
    }

    fn matched(side: Side) -> Self {
        match side {
            Side::Bid => Location::BidIn,
            Side::Ask => Location::AskIn,
        }
    }
}

#[derive(Debug)]
struct Slot {
    fragment: OrderFragment,
    /// Insertion sequence, the last tie-break inside a heap
    seq: u64,
    location: Location,
    /// Opposite-side fragment this one is matched with, while matched
    partner: Option<FragmentId>,
}

#[derive(Debug, Clone, Copy)]
struct HeapKey {
    priority: PriorityKey,
    seq: u64,
}

type FragmentHeap = IndexedHeap<FragmentId, HeapKey>;

fn best_first(comparator: &Arc<dyn OrderComparator>) -> FragmentHeap {
    let comparator = Arc::clone(comparator);
    IndexedHeap::new(Box::new(move |a: &HeapKey, b: &HeapKey| {
        comparator
            .compare(&a.priority, &b.priority)
            .then(a.seq.cmp(&b.seq))
    }))
}

fn worst_first(comparator: &Arc<dyn OrderComparator>) -> FragmentHeap {
    let comparator = Arc::clone(comparator);
    IndexedHeap::new(Box::new(move |a: &HeapKey, b: &HeapKey| {
        comparator
            .compare(&a.priority, &b.priority)
            .then(a.seq.cmp(&b.seq))
            .reverse()
    }))
}

/// True when `candidate` is a strictly better price than `incumbent` for `side`
fn improves(side: Side, candidate: Price, incumbent: Price) -> bool {
    match side {
        Side::Bid => candidate > incumbent,
        Side::Ask => candidate < incumbent,
    }
}

// ============================================================================
// Four-Heap Order Book
// ============================================================================

/// Double-auction book built from four priority queues.
///
/// - `bids_out` / `asks_out` hold unmatched fragments, best first
/// - `bids_in` / `asks_in` hold matched fragments, worst first
///
/// Every matched bid is paired with one matched ask of equal quantity from a
/// different agent, so harvesting is a walk over the pairs. Orders are split
/// into fragment chains whenever only part of their quantity can move
/// between the matched and unmatched sets.
pub struct FourHeapOrderBook {
    comparator: Arc<dyn OrderComparator>,
    arena: Slab<Slot>,
    roots: HashMap<OrderId, FragmentId>,
    bids_in: FragmentHeap,
    bids_out: FragmentHeap,
    asks_in: FragmentHeap,
    asks_out: FragmentHeap,
    sequence: u64,
}

impl FourHeapOrderBook {
    /// Create an empty book with price-time priority
    pub fn new() -> Self {
        Self::with_comparator(Arc::new(PriceTimeComparator))
    }

    /// Create an empty book ranking fragments with `comparator`
    pub fn with_comparator(comparator: Arc<dyn OrderComparator>) -> Self {
        Self {
            bids_in: worst_first(&comparator),
            bids_out: best_first(&comparator),
            asks_in: worst_first(&comparator),
            asks_out: best_first(&comparator),
            comparator,
            arena: Slab::new(),
            roots: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn comparator(&self) -> &dyn OrderComparator {
        self.comparator.as_ref()
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    fn slot(&self, id: FragmentId) -> &Slot {
        &self.arena[id.key()]
    }

    fn slot_mut(&mut self, id: FragmentId) -> &mut Slot {
        &mut self.arena[id.key()]
    }

    fn fragment(&self, id: FragmentId) -> &OrderFragment {
        &self.slot(id).fragment
    }

    fn price_of(&self, id: FragmentId) -> Price {
        self.fragment(id).price()
    }

    fn agent_of(&self, id: FragmentId) -> AgentId {
        self.fragment(id).agent()
    }

    fn quantity_of(&self, id: FragmentId) -> Quantity {
        self.fragment(id).quantity()
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    fn heap(&self, location: Location) -> Option<&FragmentHeap> {
        match location {
            Location::BidOut => Some(&self.bids_out),
            Location::BidIn => Some(&self.bids_in),
            Location::AskOut => Some(&self.asks_out),
            Location::AskIn => Some(&self.asks_in),
            Location::Detached | Location::Filled => None,
        }
    }

    fn heap_mut(&mut self, location: Location) -> Option<&mut FragmentHeap> {
        match location {
            Location::BidOut => Some(&mut self.bids_out),
            Location::BidIn => Some(&mut self.bids_in),
            Location::AskOut => Some(&mut self.asks_out),
            Location::AskIn => Some(&mut self.asks_in),
            Location::Detached | Location::Filled => None,
        }
    }

    fn top(&self, location: Location) -> Option<FragmentId> {
        self.heap(location).and_then(|heap| heap.peek())
    }

    fn top_fragment(&self, location: Location) -> Option<&OrderFragment> {
        self.top(location).map(|id| self.fragment(id))
    }

    /// Insert a detached fragment into the heap for `location`.
    fn push(&mut self, id: FragmentId, location: Location) {
        let slot = self.slot(id);
        debug_assert_eq!(slot.location, Location::Detached);
        let key = HeapKey {
            priority: slot.fragment.priority_key(),
            seq: slot.seq,
        };

        self.slot_mut(id).location = location;
        if let Some(heap) = self.heap_mut(location) {
            heap.push(id, key);
        }
    }

    /// Take a fragment out of whichever heap holds it.
    fn detach(&mut self, id: FragmentId) {
        let location = self.slot(id).location;
        if let Some(heap) = self.heap_mut(location) {
            heap.remove(&id);
        }
        self.slot_mut(id).location = Location::Detached;
    }

    /// Cut a detached fragment down to `quantity` and link a detached child
    /// holding the remainder.
    fn split(&mut self, id: FragmentId, quantity: Quantity) -> FragmentId {
        let seq = self.next_sequence();
        let child_id = FragmentId::new(self.arena.vacant_key());

        let slot = self.slot(id);
        debug_assert_eq!(slot.location, Location::Detached);
        debug_assert!(quantity > 0 && quantity < slot.fragment.quantity());
        let child = slot
            .fragment
            .remainder(child_id, slot.fragment.quantity() - quantity);

        let key = self.arena.insert(Slot {
            fragment: child,
            seq,
            location: Location::Detached,
            partner: None,
        });
        debug_assert_eq!(key, child_id.key());

        let parent = &mut self.slot_mut(id).fragment;
        parent.set_quantity(quantity);
        parent.set_child(Some(child_id));

        trace!(fragment = ?id, child = ?child_id, quantity, "split fragment");
        child_id
    }

    fn link(&mut self, bid: FragmentId, ask: FragmentId) {
        debug_assert_eq!(self.quantity_of(bid), self.quantity_of(ask));
        self.slot_mut(bid).partner = Some(ask);
        self.slot_mut(ask).partner = Some(bid);
    }

    fn chain_ids(&self, root: FragmentId) -> SmallVec<[FragmentId; 4]> {
        let mut ids = SmallVec::new();
        let mut next = Some(root);
        while let Some(id) = next {
            ids.push(id);
            next = self.fragment(id).child();
        }
        ids
    }

    // ========================================================================
    // Rebalancing
    // ========================================================================

    /// Restore the matching invariants after any insertion or removal.
    ///
    /// Repeats the first applicable step until none applies. Every step
    /// raises matched volume, or keeps it and widens the matched bid/ask
    /// value gap, so the loop terminates.
    fn rebalance(&mut self) {
        while self.try_displace(Side::Bid)
            || self.try_displace(Side::Ask)
            || self.try_cross()
        {}
    }

    /// Swap the best unmatched fragment of `side` with the worst matched one
    /// when it offers a strictly better price. The displaced fragment keeps
    /// its place in time priority and returns to the unmatched heap.
    fn try_displace(&mut self, side: Side) -> bool {
        let (Some(incoming), Some(outgoing)) =
            (self.top(Location::unmatched(side)), self.top(Location::matched(side)))
        else {
            return false;
        };

        if !improves(side, self.price_of(incoming), self.price_of(outgoing)) {
            return false;
        }

        let chosen = if Some(self.agent_of(incoming)) != self.partner_agent(outgoing) {
            Some((incoming, outgoing))
        } else {
            self.displacement_between_agents(side)
        };

        match chosen {
            Some((incoming, outgoing)) => {
                self.displace(side, incoming, outgoing);
                true
            },
            None => false,
        }
    }

    /// Search past the tops for an unmatched fragment that improves on a
    /// matched one whose partner belongs to another agent.
    fn displacement_between_agents(&self, side: Side) -> Option<(FragmentId, FragmentId)> {
        let incoming = self.heap(Location::unmatched(side))?.sorted();
        let matched = self.heap(Location::matched(side))?.sorted();

        for candidate in incoming {
            let price = self.price_of(candidate);
            let agent = self.agent_of(candidate);
            let outgoing = matched.iter().copied().find(|&id| {
                improves(side, price, self.price_of(id)) && self.partner_agent(id) != Some(agent)
            });
            if let Some(outgoing) = outgoing {
                return Some((candidate, outgoing));
            }
        }

        debug!(side = %side, "displacement blocked by self-trade rule");
        None
    }

    fn displace(&mut self, side: Side, incoming: FragmentId, outgoing: FragmentId) {
        let unmatched = Location::unmatched(side);
        let matched = Location::matched(side);
        let Some(counterpart) = self.slot(outgoing).partner else {
            panic!("matched fragment {:?} has no partner", outgoing);
        };

        self.detach(incoming);
        self.detach(outgoing);
        self.detach(counterpart);

        let incoming_qty = self.quantity_of(incoming);
        let outgoing_qty = self.quantity_of(outgoing);
        match incoming_qty.cmp(&outgoing_qty) {
            Ordering::Greater => {
                let rest = self.split(incoming, outgoing_qty);
                self.push(rest, unmatched);
            },
            Ordering::Less => {
                // The part of the old pair that is not displaced stays matched
                let rest = self.split(outgoing, incoming_qty);
                let counter_rest = self.split(counterpart, incoming_qty);
                match side {
                    Side::Bid => self.link(rest, counter_rest),
                    Side::Ask => self.link(counter_rest, rest),
                }
                self.push(rest, matched);
                self.push(counter_rest, Location::matched(side.opposite()));
            },
            Ordering::Equal => {},
        }

        self.slot_mut(outgoing).partner = None;
        match side {
            Side::Bid => self.link(incoming, counterpart),
            Side::Ask => self.link(counterpart, incoming),
        }
        self.push(incoming, matched);
        self.push(counterpart, Location::matched(side.opposite()));
        self.push(outgoing, unmatched);

        trace!(
            side = %side,
            incoming = ?incoming,
            displaced = ?outgoing,
            quantity = self.quantity_of(incoming),
            "displaced matched fragment"
        );
    }

    /// Match the best unmatched bid with the best unmatched ask when they
    /// cross. When both belong to one agent, the next best fragments from
    /// other agents are tried instead.
    fn try_cross(&mut self) -> bool {
        let (Some(bid), Some(ask)) = (self.top(Location::BidOut), self.top(Location::AskOut)) else {
            return false;
        };

        if self.price_of(bid) < self.price_of(ask) {
            return false;
        }

        let chosen = if self.agent_of(bid) != self.agent_of(ask) {
            self.fits_matched_set(bid, ask).then_some((bid, ask))
        } else {
            self.cross_between_agents()
        };

        match chosen {
            Some((bid, ask)) => {
                self.cross(bid, ask);
                true
            },
            None => false,
        }
    }

    /// Best crossing bid and ask from different agents, if any.
    fn cross_between_agents(&self) -> Option<(FragmentId, FragmentId)> {
        let asks = self.asks_out.sorted();

        for bid in self.bids_out.sorted() {
            let bid_price = self.price_of(bid);
            let agent = self.agent_of(bid);
            let ask = asks
                .iter()
                .copied()
                .find(|&id| self.price_of(id) <= bid_price && self.agent_of(id) != agent);
            if let Some(ask) = ask {
                if self.fits_matched_set(bid, ask) {
                    return Some((bid, ask));
                }
            }
        }

        debug!("cross blocked by self-trade rule");
        None
    }

    /// Never let a new pair undercut the matched set.
    fn fits_matched_set(&self, bid: FragmentId, ask: FragmentId) -> bool {
        let bid_price = self.price_of(bid);
        let ask_price = self.price_of(ask);

        if let Some(worst_ask) = self.top(Location::AskIn) {
            if bid_price < self.price_of(worst_ask) {
                trace!(bid = %bid_price, "cross would undercut a matched ask");
                return false;
            }
        }
        if let Some(worst_bid) = self.top(Location::BidIn) {
            if ask_price > self.price_of(worst_bid) {
                trace!(ask = %ask_price, "cross would overtake a matched bid");
                return false;
            }
        }
        true
    }

    fn cross(&mut self, bid: FragmentId, ask: FragmentId) {
        self.detach(bid);
        self.detach(ask);

        let bid_qty = self.quantity_of(bid);
        let ask_qty = self.quantity_of(ask);
        match bid_qty.cmp(&ask_qty) {
            Ordering::Greater => {
                let rest = self.split(bid, ask_qty);
                self.push(rest, Location::BidOut);
            },
            Ordering::Less => {
                let rest = self.split(ask, bid_qty);
                self.push(rest, Location::AskOut);
            },
            Ordering::Equal => {},
        }

        self.link(bid, ask);
        self.push(bid, Location::BidIn);
        self.push(ask, Location::AskIn);

        trace!(
            bid = %self.price_of(bid),
            ask = %self.price_of(ask),
            quantity = self.quantity_of(bid),
            "matched bid and ask"
        );
    }

    fn partner_agent(&self, id: FragmentId) -> Option<AgentId> {
        self.slot(id).partner.map(|partner| self.agent_of(partner))
    }

    /// Free an order's chain once none of its fragments sits in a heap.
    fn release_if_resolved(&mut self, order_id: OrderId) {
        let Some(&root) = self.roots.get(&order_id) else {
            return;
        };

        let chain = self.chain_ids(root);
        if chain
            .iter()
            .all(|id| self.slot(*id).location == Location::Filled)
        {
            for id in chain {
                self.arena.remove(id.key());
            }
            self.roots.remove(&order_id);
            trace!(order_id = %order_id, "order fully filled");
        }
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            self.check_balanced();
        }
    }

    fn volume(heap: &FragmentHeap) -> u64 {
        heap.iter().map(|(_, key)| key.priority.quantity as u64).sum()
    }

    fn price_bounds(heap: &FragmentHeap) -> (Option<Price>, Option<Price>) {
        let prices = heap.iter().map(|(_, key)| key.priority.price);
        let (min, max) = prices.fold((None, None), |(min, max): (Option<Price>, Option<Price>), p| {
            (
                Some(min.map_or(p, |m| m.min(p))),
                Some(max.map_or(p, |m| m.max(p))),
            )
        });
        (min, max)
    }
}

impl Default for FourHeapOrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FourHeapOrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FourHeapOrderBook")
            .field("comparator", &self.comparator.name())
            .field("bids_out", &self.bids_out.len())
            .field("bids_in", &self.bids_in.len())
            .field("asks_in", &self.asks_in.len())
            .field("asks_out", &self.asks_out.len())
            .finish()
    }
}

// ============================================================================
// OrderBook Implementation
// ============================================================================

impl OrderBook for FourHeapOrderBook {
    fn add(&mut self, order: Order) -> Result<(), MarketError> {
        if self.roots.contains_key(&order.id()) {
            return Err(MarketError::DuplicateOrder(order.id()));
        }

        let seq = self.next_sequence();
        let id = FragmentId::new(self.arena.vacant_key());
        self.arena.insert(Slot {
            fragment: OrderFragment::root(id, &order),
            seq,
            location: Location::Detached,
            partner: None,
        });
        self.roots.insert(order.id(), id);
        self.push(id, Location::unmatched(order.side()));

        trace!(
            order_id = %order.id(),
            agent = %order.agent(),
            side = %order.side(),
            price = %order.price(),
            quantity = order.quantity(),
            "order added"
        );

        self.rebalance();
        self.debug_check();
        Ok(())
    }

    fn remove(&mut self, order_id: OrderId) -> Option<Quantity> {
        let root = self.roots.remove(&order_id)?;
        let chain = self.chain_ids(root);

        let mut cancelled: Quantity = 0;
        for &id in &chain {
            let location = self.slot(id).location;
            if location == Location::Filled {
                continue;
            }

            self.detach(id);
            if let Some(partner) = self.slot_mut(id).partner.take() {
                // The partner keeps its priority and waits to be matched again
                self.detach(partner);
                self.slot_mut(partner).partner = None;
                let side = self.fragment(partner).side();
                self.push(partner, Location::unmatched(side));
            }
            cancelled += self.quantity_of(id);
        }

        for id in chain {
            self.arena.remove(id.key());
        }

        debug!(order_id = %order_id, cancelled, "order removed");

        self.rebalance();
        self.debug_check();
        Some(cancelled)
    }

    fn match_orders(&mut self) -> Vec<MatchedPair> {
        let mut bids = Vec::with_capacity(self.bids_in.len());
        while let Some((bid, _)) = self.bids_in.pop() {
            bids.push(bid);
        }
        // Popped worst first
        bids.reverse();

        let mut pairs = Vec::with_capacity(bids.len());
        let mut touched = Vec::with_capacity(bids.len() * 2);
        for bid in bids {
            let Some(ask) = self.slot_mut(bid).partner.take() else {
                panic!("matched bid {:?} has no partner", bid);
            };
            self.asks_in.remove(&ask);
            self.slot_mut(ask).partner = None;

            for id in [bid, ask] {
                let slot = self.slot_mut(id);
                slot.location = Location::Filled;
                slot.fragment.mark_filled();
                touched.push(slot.fragment.order_id());
            }

            pairs.push(MatchedPair {
                bid: self.fragment(bid).clone(),
                ask: self.fragment(ask).clone(),
            });
        }

        assert!(
            self.asks_in.is_empty(),
            "matched asks left behind after harvesting"
        );

        for order_id in touched {
            self.release_if_resolved(order_id);
        }

        debug!(pairs = pairs.len(), "harvested matched pairs");
        self.debug_check();
        pairs
    }

    fn matched_pairs(&self) -> Vec<MatchedPair> {
        let mut bids = self.bids_in.sorted();
        bids.reverse();

        bids.into_iter()
            .filter_map(|bid| {
                let ask = self.slot(bid).partner?;
                Some(MatchedPair {
                    bid: self.fragment(bid).clone(),
                    ask: self.fragment(ask).clone(),
                })
            })
            .collect()
    }

    fn reset(&mut self) {
        self.bids_in.clear();
        self.bids_out.clear();
        self.asks_in.clear();
        self.asks_out.clear();
        self.arena.clear();
        self.roots.clear();
        self.sequence = 0;
    }

    fn highest_unmatched_bid(&self) -> Option<&OrderFragment> {
        self.top_fragment(Location::BidOut)
    }

    fn lowest_matched_bid(&self) -> Option<&OrderFragment> {
        self.top_fragment(Location::BidIn)
    }

    fn lowest_unmatched_ask(&self) -> Option<&OrderFragment> {
        self.top_fragment(Location::AskOut)
    }

    fn highest_matched_ask(&self) -> Option<&OrderFragment> {
        self.top_fragment(Location::AskIn)
    }

    fn depth(&self) -> usize {
        self.bids_in.len() + self.bids_out.len() + self.asks_in.len() + self.asks_out.len()
    }

    fn matched_volume(&self) -> u64 {
        Self::volume(&self.bids_in)
    }

    fn unmatched_bids(&self) -> Vec<&OrderFragment> {
        self.bids_out
            .sorted()
            .into_iter()
            .map(|id| self.fragment(id))
            .collect()
    }

    fn unmatched_asks(&self) -> Vec<&OrderFragment> {
        self.asks_out
            .sorted()
            .into_iter()
            .map(|id| self.fragment(id))
            .collect()
    }

    fn bids(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_> {
        Box::new(
            self.bids_out
                .iter()
                .chain(self.bids_in.iter())
                .map(move |(id, _)| self.fragment(*id)),
        )
    }

    fn asks(&self) -> Box<dyn Iterator<Item = &OrderFragment> + '_> {
        Box::new(
            self.asks_out
                .iter()
                .chain(self.asks_in.iter())
                .map(move |(id, _)| self.fragment(*id)),
        )
    }

    fn chain(&self, order_id: OrderId) -> Option<FragmentChain<'_>> {
        let root = *self.roots.get(&order_id)?;
        let fragments = self
            .chain_ids(root)
            .into_iter()
            .map(|id| self.fragment(id))
            .collect();
        Some(FragmentChain::new(fragments))
    }

    fn contains(&self, order_id: OrderId) -> bool {
        self.roots.contains_key(&order_id)
    }

    fn check_balanced(&self) {
        let bid_volume = Self::volume(&self.bids_in);
        let ask_volume = Self::volume(&self.asks_in);
        assert_eq!(
            bid_volume, ask_volume,
            "matched bid volume {} differs from matched ask volume {}",
            bid_volume, ask_volume
        );
        assert_eq!(self.bids_in.len(), self.asks_in.len(), "unpaired matched fragments");

        for (&bid, _) in self.bids_in.iter() {
            let Some(ask) = self.slot(bid).partner else {
                panic!("matched bid {:?} has no partner", bid);
            };
            let ask_slot = self.slot(ask);
            assert_eq!(ask_slot.location, Location::AskIn, "partner of {:?} is not matched", bid);
            assert_eq!(ask_slot.partner, Some(bid), "asymmetric pair {:?}/{:?}", bid, ask);

            let bid_fragment = self.fragment(bid);
            let ask_fragment = &ask_slot.fragment;
            assert_eq!(bid_fragment.quantity(), ask_fragment.quantity(), "pair quantities differ");
            assert!(
                bid_fragment.price() >= ask_fragment.price(),
                "matched pair does not cross: {} < {}",
                bid_fragment.price(),
                ask_fragment.price()
            );
            assert_ne!(bid_fragment.agent(), ask_fragment.agent(), "self-trade in matched set");
        }
    }

    fn check_invariants(&self) -> bool {
        fn at_most(low: Option<Price>, high: Option<Price>) -> bool {
            match (low, high) {
                (Some(low), Some(high)) => low <= high,
                _ => true,
            }
        }

        let (min_bid_in, _) = Self::price_bounds(&self.bids_in);
        let (_, max_ask_in) = Self::price_bounds(&self.asks_in);
        let (_, max_bid_out) = Self::price_bounds(&self.bids_out);
        let (min_ask_out, _) = Self::price_bounds(&self.asks_out);

        at_most(max_ask_in, min_bid_in)
            && at_most(max_bid_out, min_bid_in)
            && at_most(max_ask_in, min_ask_out)
            && at_most(max_bid_out, min_ask_out)
    }

    fn name(&self) -> &str {
        "FourHeap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::comparators::VolumePriorityComparator;
    use proptest::prelude::*;

    fn price(value: f64) -> Price {
        Price::from_f64(value).unwrap()
    }

    fn bid(agent: u64, value: f64, quantity: Quantity) -> Order {
        Order::bid(AgentId(agent), price(value), quantity).unwrap()
    }

    fn ask(agent: u64, value: f64, quantity: Quantity) -> Order {
        Order::ask(AgentId(agent), price(value), quantity).unwrap()
    }

    #[test]
    fn test_best_unmatched_bid() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 2.0, 1)).unwrap();
        book.add(bid(1, 3.0, 1)).unwrap();

        assert_eq!(book.highest_unmatched_bid().unwrap().price(), price(3.0));
        assert_eq!(book.depth(), 2);
        assert_eq!(book.matched_volume(), 0);
    }

    #[test]
    fn test_no_self_trade() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 10.0, 1)).unwrap();
        book.add(ask(1, 5.0, 1)).unwrap();

        assert_eq!(book.matched_volume(), 0);
        assert!(book.match_orders().is_empty());
        assert_eq!(book.depth(), 2);
        book.check_balanced();
    }

    #[test]
    fn test_self_trade_does_not_block_other_agents() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 10.0, 1)).unwrap();
        book.add(ask(1, 5.0, 1)).unwrap();
        book.add(ask(2, 6.0, 1)).unwrap();
        assert_eq!(book.matched_volume(), 1);

        book.add(bid(3, 8.0, 1)).unwrap();
        assert_eq!(book.matched_volume(), 2);
        assert!(book.check_invariants());
        book.check_balanced();

        let pairs = book.match_orders();
        let prices: Vec<(Price, Price)> =
            pairs.iter().map(|p| (p.bid.price(), p.ask.price())).collect();
        assert_eq!(prices, vec![(price(10.0), price(6.0)), (price(8.0), price(5.0))]);
        assert!(pairs.iter().all(|p| p.bid.agent() != p.ask.agent()));
    }

    #[test]
    fn test_displacement_skips_own_counterpart() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(4, 10.0, 1)).unwrap();
        book.add(ask(2, 7.0, 1)).unwrap();
        book.add(bid(1, 9.0, 1)).unwrap();
        book.add(ask(5, 6.0, 1)).unwrap();
        assert_eq!(book.matched_volume(), 2);

        // The worst matched ask is paired with agent 1's own bid
        book.add(ask(1, 5.0, 1)).unwrap();
        assert_eq!(book.matched_volume(), 2);
        assert!(book.check_invariants());
        assert_eq!(book.highest_matched_ask().unwrap().price(), price(6.0));
        assert_eq!(book.lowest_unmatched_ask().unwrap().price(), price(7.0));

        let pairs = book.match_orders();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.bid.agent() != p.ask.agent()));
    }

    #[test]
    fn test_partial_fill_splits_bid() {
        let mut book = FourHeapOrderBook::new();
        let big_bid = bid(1, 10.0, 10);
        let small_ask = ask(2, 5.0, 5);
        let bid_id = big_bid.id();
        let ask_id = small_ask.id();

        book.add(big_bid).unwrap();
        book.add(small_ask).unwrap();
        assert_eq!(book.matched_volume(), 5);

        let pairs = book.match_orders();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].quantity(), 5);
        assert_eq!(pairs[0].bid.order_id(), bid_id);
        assert_eq!(pairs[0].ask.order_id(), ask_id);
        assert!(pairs[0].bid.is_filled() && pairs[0].ask.is_filled());

        // The ask is gone, the bid remainder waits unmatched
        assert!(!book.contains(ask_id));
        let remainder = book.highest_unmatched_bid().unwrap();
        assert_eq!(remainder.quantity(), 5);
        assert_eq!(remainder.order_id(), bid_id);
        assert!(!remainder.is_filled());

        let chain = book.chain(bid_id).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.aggregate_volume(), 10);
        assert_eq!(chain.aggregate_filled_volume(), 5);
        assert_eq!(chain.aggregate_unfilled_volume(), 5);
        assert!(chain.head().is_filled());
    }

    #[test]
    fn test_duplicate_order() {
        let mut book = FourHeapOrderBook::new();
        let order = bid(1, 10.0, 1);
        book.add(order.clone()).unwrap();

        assert_eq!(
            book.add(order.clone()),
            Err(MarketError::DuplicateOrder(order.id()))
        );
        assert_eq!(book.depth(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut book = FourHeapOrderBook::new();
        let order = bid(1, 10.0, 4);
        let id = order.id();
        book.add(order).unwrap();

        assert_eq!(book.remove(id), Some(4));
        assert_eq!(book.remove(id), None);
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove_matched_order_unpairs_partner() {
        let mut book = FourHeapOrderBook::new();
        let b = bid(1, 10.0, 3);
        let b_id = b.id();
        book.add(b).unwrap();
        book.add(ask(2, 8.0, 3)).unwrap();
        assert_eq!(book.matched_volume(), 3);

        assert_eq!(book.remove(b_id), Some(3));
        assert_eq!(book.matched_volume(), 0);
        assert_eq!(book.lowest_unmatched_ask().unwrap().price(), price(8.0));

        // A fresh bid picks up the released ask
        book.add(bid(3, 9.0, 3)).unwrap();
        assert_eq!(book.matched_volume(), 3);
        assert!(book.check_invariants());
    }

    #[test]
    fn test_remove_partially_matched_order() {
        let mut book = FourHeapOrderBook::new();
        let b = bid(1, 10.0, 10);
        let b_id = b.id();
        book.add(b).unwrap();
        book.add(ask(2, 5.0, 4)).unwrap();

        assert_eq!(book.chain(b_id).unwrap().len(), 2);
        assert_eq!(book.remove(b_id), Some(10));
        assert_eq!(book.matched_volume(), 0);
        assert_eq!(book.depth(), 1);
        assert!(!book.contains(b_id));
    }

    #[test]
    fn test_better_bid_displaces_matched_bid() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 6.0, 1)).unwrap();
        book.add(ask(2, 5.0, 1)).unwrap();
        book.add(bid(3, 8.0, 1)).unwrap();

        assert_eq!(book.matched_volume(), 1);
        assert_eq!(book.lowest_matched_bid().unwrap().price(), price(8.0));
        assert_eq!(book.highest_unmatched_bid().unwrap().price(), price(6.0));
        assert!(book.check_invariants());
    }

    #[test]
    fn test_displacement_splits_matched_pair() {
        let mut book = FourHeapOrderBook::new();
        let resting = bid(1, 6.0, 5);
        let resting_id = resting.id();
        book.add(resting).unwrap();
        book.add(ask(2, 5.0, 5)).unwrap();
        book.add(bid(3, 8.0, 2)).unwrap();

        assert_eq!(book.matched_volume(), 5);
        let unmatched = book.highest_unmatched_bid().unwrap();
        assert_eq!(unmatched.order_id(), resting_id);
        assert_eq!(unmatched.quantity(), 2);

        let volume = book.chain(resting_id).unwrap().aggregate_volume();
        assert_eq!(volume, 5);

        let pairs = book.match_orders();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].bid.price(), price(8.0));
        assert_eq!(pairs.iter().map(|p| p.quantity()).sum::<u32>(), 5);
        assert!(pairs.iter().all(|p| p.bid.price() >= p.ask.price()));
    }

    #[test]
    fn test_better_ask_displaces_matched_ask() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 10.0, 1)).unwrap();
        book.add(ask(2, 9.0, 1)).unwrap();
        book.add(ask(3, 7.0, 1)).unwrap();

        assert_eq!(book.highest_matched_ask().unwrap().price(), price(7.0));
        assert_eq!(book.lowest_unmatched_ask().unwrap().price(), price(9.0));
        assert!(book.check_invariants());
    }

    #[test]
    fn test_quote() {
        let mut book = FourHeapOrderBook::new();
        assert_eq!(book.quote(), crate::domain::MarketQuote::empty());

        book.add(bid(1, 10.0, 1)).unwrap();
        book.add(ask(2, 5.0, 1)).unwrap();
        let quote = book.quote();
        assert_eq!(quote.ask, Some(price(10.0)));
        assert_eq!(quote.bid, Some(price(5.0)));

        book.add(ask(3, 12.0, 1)).unwrap();
        book.add(bid(4, 4.0, 1)).unwrap();
        let quote = book.quote();
        assert_eq!(quote.ask, Some(price(10.0)));
        assert_eq!(quote.bid, Some(price(5.0)));
    }

    #[test]
    fn test_match_orders_best_bid_first() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 10.0, 1)).unwrap();
        book.add(bid(2, 12.0, 1)).unwrap();
        book.add(ask(3, 5.0, 1)).unwrap();
        book.add(ask(4, 6.0, 1)).unwrap();

        let pairs = book.match_orders();
        let prices: Vec<Price> = pairs.iter().map(|p| p.bid.price()).collect();
        assert_eq!(prices, vec![price(12.0), price(10.0)]);
        assert!(book.is_empty());
    }

    #[test]
    fn test_matched_pairs_preview_harvest() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 10.0, 3)).unwrap();
        book.add(bid(2, 12.0, 1)).unwrap();
        book.add(ask(3, 5.0, 2)).unwrap();
        book.add(ask(4, 6.0, 2)).unwrap();

        let preview = book.matched_pairs();
        assert_eq!(book.matched_volume(), 4);
        assert_eq!(book.depth(), 6);

        let pairs = book.match_orders();
        assert_eq!(preview.len(), pairs.len());
        for (seen, harvested) in preview.iter().zip(&pairs) {
            assert_eq!(seen.bid.order_id(), harvested.bid.order_id());
            assert_eq!(seen.ask.order_id(), harvested.ask.order_id());
            assert_eq!(seen.quantity(), harvested.quantity());
        }
        assert!(book.matched_pairs().is_empty());
    }

    #[test]
    fn test_unmatched_snapshots_sorted() {
        let mut book = FourHeapOrderBook::new();
        book.add(bid(1, 3.0, 1)).unwrap();
        book.add(bid(1, 5.0, 1)).unwrap();
        book.add(bid(1, 4.0, 1)).unwrap();
        book.add(ask(2, 9.0, 1)).unwrap();
        book.add(ask(2, 8.0, 1)).unwrap();

        let bids: Vec<Price> = book.unmatched_bids().iter().map(|f| f.price()).collect();
        assert_eq!(bids, vec![price(5.0), price(4.0), price(3.0)]);
        let asks: Vec<Price> = book.unmatched_asks().iter().map(|f| f.price()).collect();
        assert_eq!(asks, vec![price(8.0), price(9.0)]);
        assert_eq!(book.bids().count(), 3);
        assert_eq!(book.asks().count(), 2);
    }

    #[test]
    fn test_reset() {
        let mut book = FourHeapOrderBook::new();
        let order = bid(1, 10.0, 1);
        book.add(order.clone()).unwrap();
        book.add(ask(2, 9.0, 1)).unwrap();

        book.reset();
        assert!(book.is_empty());
        assert!(!book.contains(order.id()));
        assert!(book.add(order).is_ok());
    }

    #[test]
    fn test_volume_priority_book() {
        let mut book = FourHeapOrderBook::with_comparator(Arc::new(VolumePriorityComparator));
        book.add(bid(1, 5.0, 1)).unwrap();
        book.add(bid(2, 4.0, 10)).unwrap();

        // Size ranks first in the unmatched heap
        assert_eq!(book.highest_unmatched_bid().unwrap().quantity(), 10);

        book.add(ask(3, 3.0, 4)).unwrap();
        assert_eq!(book.matched_volume(), 4);
        book.check_balanced();
        assert_eq!(book.comparator().name(), "VolumePriority");
    }

    // ========================================================================
    // Property tests
    // ========================================================================

    #[derive(Debug, Clone)]
    enum Op {
        Add {
            agent: u64,
            is_bid: bool,
            price: i64,
            quantity: Quantity,
        },
        Remove(prop::sample::Index),
        Match,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0u64..4, any::<bool>(), 1i64..20, 1u32..10).prop_map(
                |(agent, is_bid, price, quantity)| Op::Add { agent, is_bid, price, quantity }
            ),
            2 => any::<prop::sample::Index>().prop_map(Op::Remove),
            1 => Just(Op::Match),
        ]
    }

    /// Replays `ops` and checks the book after each one.
    ///
    /// With `distinct_agents` every order gets its own agent, so no step is
    /// ever blocked and the full crossing invariant must hold.
    fn replay(ops: Vec<Op>, distinct_agents: bool) {
        let mut book = FourHeapOrderBook::new();
        let mut live: Vec<(OrderId, Quantity)> = Vec::new();
        let mut next_agent = 100;

        for op in ops {
            match op {
                Op::Add {
                    agent,
                    is_bid,
                    price,
                    quantity,
                } => {
                    let agent = if distinct_agents {
                        next_agent += 1;
                        AgentId(next_agent)
                    } else {
                        AgentId(agent)
                    };
                    let side = if is_bid { Side::Bid } else { Side::Ask };
                    let order =
                        Order::new(agent, side, Price::from_whole(price).unwrap(), quantity)
                            .unwrap();
                    live.push((order.id(), quantity));
                    book.add(order).unwrap();
                },
                Op::Remove(index) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (id, _) = live.remove(index.index(live.len()));
                    let was_live = book.contains(id);
                    assert_eq!(book.remove(id).is_some(), was_live);
                    let depth = book.depth();
                    assert!(book.remove(id).is_none());
                    assert_eq!(book.depth(), depth);
                },
                Op::Match => {
                    for pair in book.match_orders() {
                        assert_ne!(pair.bid.agent(), pair.ask.agent());
                        assert!(pair.bid.price() >= pair.ask.price());
                        assert_eq!(pair.bid.quantity(), pair.ask.quantity());
                    }
                },
            }

            book.check_balanced();
            if distinct_agents {
                assert!(book.check_invariants());
            }
            for (id, quantity) in &live {
                if let Some(chain) = book.chain(*id) {
                    assert_eq!(chain.aggregate_volume(), *quantity as u64);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_balanced_with_shared_agents(ops in prop::collection::vec(op_strategy(), 1..80)) {
            replay(ops, false);
        }

        #[test]
        fn prop_crossing_invariant_with_distinct_agents(
            ops in prop::collection::vec(op_strategy(), 1..80)
        ) {
            replay(ops, true);
        }
    }
}

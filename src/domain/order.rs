// ============================================================================
// Order Domain Model
// ============================================================================

use super::error::MarketError;
use crate::numeric::{Price, Quantity};
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque trader identity. Two orders from the same agent never trade with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// The fields an order comparator ranks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp: u64,
}

// ============================================================================
// Order
// ============================================================================

/// A limit order as submitted by a trading agent.
///
/// Identity is the `id`: a clone of an order is the same order, and adding
/// it to a book twice fails with `DuplicateOrder`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    id: OrderId,
    agent: AgentId,
    side: Side,
    price: Price,
    quantity: Quantity,
    timestamp: u64,
}

impl Order {
    /// Create a new order with a fresh id and timestamp 0.
    ///
    /// # Errors
    /// - `InvalidQuantity` if `quantity` is zero
    /// - `NegativePrice` if `price` is below zero
    pub fn new(
        agent: AgentId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<Self, MarketError> {
        if quantity == 0 {
            return Err(MarketError::InvalidQuantity);
        }
        if price.is_negative() {
            return Err(MarketError::NegativePrice(price));
        }

        Ok(Self {
            id: OrderId::new(),
            agent,
            side,
            price,
            quantity,
            timestamp: 0,
        })
    }

    pub fn bid(agent: AgentId, price: Price, quantity: Quantity) -> Result<Self, MarketError> {
        Self::new(agent, Side::Bid, price, quantity)
    }

    pub fn ask(agent: AgentId, price: Price, quantity: Quantity) -> Result<Self, MarketError> {
        Self::new(agent, Side::Ask, price, quantity)
    }

    /// Set the logical tick used as the time-priority key.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the limit price. Prices are never negative inside a book.
    pub(crate) fn with_price(mut self, price: Price) -> Self {
        debug_assert!(!price.is_negative());
        self.price = price;
        self
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn priority_key(&self) -> PriorityKey {
        PriorityKey {
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            timestamp: self.timestamp,
        }
    }
}

// ============================================================================
// Order Fragments
// ============================================================================

/// Handle of a fragment inside a book's fragment arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(usize);

impl FragmentId {
    pub(crate) fn new(key: usize) -> Self {
        Self(key)
    }

    pub(crate) fn key(&self) -> usize {
        self.0
    }
}

/// One piece of an order held by a book.
///
/// The first fragment of every chain is the order as submitted. Splitting a
/// fragment reduces its quantity in place and links a child holding the
/// remainder, so an order's fragments always sum to its original quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFragment {
    id: FragmentId,
    order_id: OrderId,
    agent: AgentId,
    side: Side,
    price: Price,
    quantity: Quantity,
    timestamp: u64,
    filled: bool,
    child: Option<FragmentId>,
}

impl OrderFragment {
    /// Root fragment for a freshly added order.
    pub(crate) fn root(id: FragmentId, order: &Order) -> Self {
        Self {
            id,
            order_id: order.id,
            agent: order.agent,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            timestamp: order.timestamp,
            filled: false,
            child: None,
        }
    }

    /// Unfilled remainder of `self`, to be linked as its child.
    pub(crate) fn remainder(&self, id: FragmentId, quantity: Quantity) -> Self {
        Self {
            id,
            quantity,
            filled: false,
            child: self.child,
            ..self.clone()
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: Quantity) {
        debug_assert!(quantity > 0);
        self.quantity = quantity;
    }

    pub(crate) fn set_child(&mut self, child: Option<FragmentId>) {
        self.child = child;
    }

    pub(crate) fn mark_filled(&mut self) {
        self.filled = true;
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn child(&self) -> Option<FragmentId> {
        self.child
    }

    pub fn priority_key(&self) -> PriorityKey {
        PriorityKey {
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            timestamp: self.timestamp,
        }
    }
}

/// Read-only view of all fragments of one order, in chain order.
#[derive(Debug, Clone)]
pub struct FragmentChain<'a> {
    fragments: SmallVec<[&'a OrderFragment; 4]>,
}

impl<'a> FragmentChain<'a> {
    pub(crate) fn new(fragments: SmallVec<[&'a OrderFragment; 4]>) -> Self {
        debug_assert!(!fragments.is_empty());
        Self { fragments }
    }

    pub fn order_id(&self) -> OrderId {
        self.fragments[0].order_id()
    }

    pub fn head(&self) -> &'a OrderFragment {
        self.fragments[0]
    }

    pub fn fragments(&self) -> impl Iterator<Item = &'a OrderFragment> + '_ {
        self.fragments.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Total quantity across the chain; equals the submitted quantity.
    pub fn aggregate_volume(&self) -> u64 {
        self.fragments.iter().map(|f| f.quantity() as u64).sum()
    }

    pub fn aggregate_filled_volume(&self) -> u64 {
        self.fragments
            .iter()
            .filter(|f| f.is_filled())
            .map(|f| f.quantity() as u64)
            .sum()
    }

    pub fn aggregate_unfilled_volume(&self) -> u64 {
        self.fragments
            .iter()
            .filter(|f| !f.is_filled())
            .map(|f| f.quantity() as u64)
            .sum()
    }

    /// Share of the order still waiting to be filled, in `[0, 1]`.
    pub fn unfilled_fraction(&self) -> f64 {
        self.aggregate_unfilled_volume() as f64 / self.aggregate_volume() as f64
    }

    pub fn is_filled(&self) -> bool {
        self.fragments.iter().all(|f| f.is_filled())
    }
}

/// A matched bid and ask of equal quantity harvested from a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub bid: OrderFragment,
    pub ask: OrderFragment,
}

impl MatchedPair {
    pub fn quantity(&self) -> Quantity {
        self.bid.quantity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: i64) -> Price {
        Price::from_whole(value).unwrap()
    }

    #[test]
    fn test_order_creation() {
        let order = Order::bid(AgentId(1), price(10), 5).unwrap();

        assert_eq!(order.side(), Side::Bid);
        assert!(order.is_bid());
        assert_eq!(order.quantity(), 5);
        assert_eq!(order.price(), price(10));
        assert_eq!(order.timestamp(), 0);
        assert_eq!(order.with_timestamp(7).timestamp(), 7);
    }

    #[test]
    fn test_order_validation() {
        assert!(matches!(
            Order::ask(AgentId(1), price(10), 0),
            Err(MarketError::InvalidQuantity)
        ));
        assert!(matches!(
            Order::bid(AgentId(1), price(-1), 1),
            Err(MarketError::NegativePrice(_))
        ));
        assert!(Order::bid(AgentId(1), Price::ZERO, 1).is_ok());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let order = Order::ask(AgentId(3), price(4), 2).unwrap();
        let copy = order.clone();
        assert_eq!(order.id(), copy.id());

        let other = Order::ask(AgentId(3), price(4), 2).unwrap();
        assert_ne!(order.id(), other.id());
    }

    #[test]
    fn test_fragment_remainder() {
        let order = Order::bid(AgentId(1), price(10), 10).unwrap();
        let mut head = OrderFragment::root(FragmentId::new(0), &order);
        head.set_child(Some(FragmentId::new(9)));

        let child = head.remainder(FragmentId::new(1), 4);
        head.set_quantity(6);
        head.set_child(Some(child.id()));

        assert_eq!(child.quantity(), 4);
        assert_eq!(child.order_id(), order.id());
        assert_eq!(child.child(), Some(FragmentId::new(9)));
        assert!(!child.is_filled());
        assert_eq!(head.child(), Some(FragmentId::new(1)));
    }

    #[test]
    fn test_chain_aggregates() {
        let order = Order::bid(AgentId(1), price(10), 10).unwrap();
        let mut head = OrderFragment::root(FragmentId::new(0), &order);
        let tail = head.remainder(FragmentId::new(1), 4);
        head.set_quantity(6);
        head.mark_filled();

        let chain = FragmentChain::new(smallvec::smallvec![&head, &tail]);
        assert_eq!(chain.aggregate_volume(), 10);
        assert_eq!(chain.aggregate_filled_volume(), 6);
        assert_eq!(chain.aggregate_unfilled_volume(), 4);
        assert!((chain.unfilled_fraction() - 0.4).abs() < 1e-12);
        assert!(!chain.is_filled());
        assert_eq!(chain.order_id(), order.id());
    }
}

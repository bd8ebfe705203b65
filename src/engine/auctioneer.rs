// ============================================================================
// Auctioneer
// Drives one market: admission, insertion, clearing and the auction clock
// ============================================================================

use crate::domain::{AuctionClock, MarketError, MarketQuote, Order, OrderId, Transaction};
use crate::interfaces::{
    Acceptance, AcceptancePolicy, EventHandler, MarketEvent, MarketTrigger, OrderBook,
    PricingPolicy, TimingCondition, TimingContext,
};
use crate::numeric::NumericResult;
use crate::policy::{NeverClearingCondition, OrderPlacedClearingCondition};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Double-auction driver with pluggable book and policies.
///
/// Defaults to a continuous double auction: the book clears after every
/// accepted order, days never end and the auction never closes on its own.
pub struct Auctioneer {
    /// Market name (e.g., "widgets")
    name: Arc<String>,

    book: Box<dyn OrderBook>,

    pricing: Box<dyn PricingPolicy>,

    acceptance: Box<dyn AcceptancePolicy>,

    /// When to clear the book
    clearing: Box<dyn TimingCondition>,

    /// When a round ends the trading day
    day_ending: Box<dyn TimingCondition>,

    /// When a round closes the auction
    closing: Box<dyn TimingCondition>,

    /// Event handler for processing events
    event_handler: Arc<dyn EventHandler>,

    clock: AuctionClock,

    /// Logical tick stamped on each submitted order
    next_timestamp: u64,

    closed: bool,
}

impl Auctioneer {
    /// Create a new auctioneer
    pub fn new(
        name: String,
        book: Box<dyn OrderBook>,
        pricing: Box<dyn PricingPolicy>,
        acceptance: Box<dyn AcceptancePolicy>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            name: Arc::new(name),
            book,
            pricing,
            acceptance,
            clearing: Box::new(OrderPlacedClearingCondition),
            day_ending: Box::new(NeverClearingCondition),
            closing: Box::new(NeverClearingCondition),
            event_handler,
            clock: AuctionClock::new(),
            next_timestamp: 0,
            closed: false,
        }
    }

    /// Builder method: Replace the clearing condition
    pub fn with_clearing_condition(mut self, condition: Box<dyn TimingCondition>) -> Self {
        self.clearing = condition;
        self
    }

    /// Builder method: Replace the day-ending condition
    pub fn with_day_ending_condition(mut self, condition: Box<dyn TimingCondition>) -> Self {
        self.day_ending = condition;
        self
    }

    /// Builder method: Replace the closing condition
    pub fn with_closing_condition(mut self, condition: Box<dyn TimingCondition>) -> Self {
        self.closing = condition;
        self
    }

    /// Submit an order to the market
    ///
    /// # Errors
    /// - `AuctionClosed` once the auction has closed
    /// - `IllegalOrder` when the acceptance policy rejects the order
    /// - `DuplicateOrder` when the order is already live
    /// - `InvalidPrice` when an immediate clearing cannot price a pair. The
    ///   order stays in the book and its `OrderPlaced` event is still emitted.
    pub fn submit(&mut self, order: Order) -> Result<Vec<MarketEvent>, MarketError> {
        if self.closed {
            return Err(MarketError::AuctionClosed);
        }

        let order = order.with_timestamp(self.next_tick());
        let quote = self.book.quote();

        if let Acceptance::Rejected(reason) = self.acceptance.check(&order, &quote) {
            debug!(
                market = %self.name,
                order_id = %order.id(),
                policy = self.acceptance.name(),
                %reason,
                "order rejected"
            );
            self.event_handler.on_event(MarketEvent::OrderRejected {
                order_id: order.id(),
                reason: reason.clone(),
                timestamp: Utc::now(),
            });
            return Err(MarketError::IllegalOrder {
                order_id: order.id(),
                reason,
            });
        }

        let placed = MarketEvent::OrderPlaced {
            order_id: order.id(),
            agent: order.agent(),
            side: order.side(),
            price: order.price(),
            quantity: order.quantity(),
            timestamp: Utc::now(),
        };
        self.book.add(order)?;
        self.event_handler.on_event(placed.clone());

        let mut events = vec![placed];
        if self.should_clear(MarketTrigger::OrderPlaced) {
            let trades = Self::transaction_events(self.execute()?);
            self.event_handler.on_events(trades.clone());
            events.extend(trades);
        }

        Ok(events)
    }

    /// Cancel an order
    pub fn cancel(&mut self, order_id: OrderId) -> Option<MarketEvent> {
        let cancelled_quantity = self.book.remove(order_id)?;
        let event = MarketEvent::OrderCancelled {
            order_id,
            cancelled_quantity,
            timestamp: Utc::now(),
        };
        self.event_handler.on_event(event.clone());
        Some(event)
    }

    /// Harvest every matched pair and turn it into a priced transaction
    pub fn clear(&mut self) -> NumericResult<Vec<Transaction>> {
        let transactions = self.execute()?;
        if !transactions.is_empty() {
            self.event_handler
                .on_events(Self::transaction_events(transactions.clone()));
        }
        Ok(transactions)
    }

    /// Close the current round and run the round-level conditions
    pub fn end_round(&mut self) -> NumericResult<Vec<MarketEvent>> {
        if self.closed {
            return Ok(Vec::new());
        }

        self.clock.advance_round();
        let mut events = vec![MarketEvent::RoundClosed {
            round: self.clock.round,
            timestamp: Utc::now(),
        }];

        if self.should_clear(MarketTrigger::RoundClosed) {
            match self.execute() {
                Ok(transactions) => events.extend(Self::transaction_events(transactions)),
                Err(err) => {
                    self.event_handler.on_events(events);
                    return Err(err);
                },
            }
        }

        let round_ctx = TimingContext::new(&self.clock, MarketTrigger::RoundClosed);
        if self.day_ending.eval(&round_ctx) {
            self.clock.end_day();
            debug!(market = %self.name, day = self.clock.day, "day closed");
            events.push(MarketEvent::DayClosed {
                day: self.clock.day,
                timestamp: Utc::now(),
            });
        }

        let closing_ctx = TimingContext::new(&self.clock, MarketTrigger::RoundClosed);
        if self.closing.eval(&closing_ctx) {
            events.push(self.mark_closed());
        }

        self.event_handler.on_events(events.clone());
        Ok(events)
    }

    /// Stop taking orders now
    pub fn close(&mut self) -> Option<MarketEvent> {
        if self.closed {
            return None;
        }
        let event = self.mark_closed();
        self.event_handler.on_event(event.clone());
        Some(event)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quote(&self) -> MarketQuote {
        self.book.quote()
    }

    pub fn book(&self) -> &dyn OrderBook {
        self.book.as_ref()
    }

    pub fn clock(&self) -> &AuctionClock {
        &self.clock
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pricing_policy(&self) -> &dyn PricingPolicy {
        self.pricing.as_ref()
    }

    pub fn acceptance_policy(&self) -> &dyn AcceptancePolicy {
        self.acceptance.as_ref()
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn next_tick(&mut self) -> u64 {
        let tick = self.next_timestamp;
        self.next_timestamp += 1;
        tick
    }

    fn should_clear(&mut self, trigger: MarketTrigger) -> bool {
        self.clearing
            .eval(&TimingContext::new(&self.clock, trigger))
    }

    /// Price and record every matched pair without emitting events.
    ///
    /// Pairs are priced before they are harvested, so a pricing error leaves
    /// the book as it was.
    fn execute(&mut self) -> NumericResult<Vec<Transaction>> {
        let quote = self.book.quote();
        let pending = self.book.matched_pairs();

        let mut prices = Vec::with_capacity(pending.len());
        for pair in &pending {
            match self
                .pricing
                .determine_clearing_price(&pair.bid, &pair.ask, &quote)
            {
                Ok(price) => prices.push(price),
                Err(err) => {
                    warn!(
                        market = %self.name,
                        policy = self.pricing.name(),
                        %err,
                        pairs = pending.len(),
                        "pricing failed, book left uncleared"
                    );
                    return Err(err);
                },
            }
        }

        let pairs = self.book.match_orders();
        debug_assert_eq!(pairs.len(), prices.len());
        let transactions: Vec<Transaction> = pairs
            .iter()
            .zip(prices)
            .map(|(pair, price)| Transaction::new(pair, price, self.clock.round, self.clock.day))
            .collect();

        if !transactions.is_empty() {
            debug!(
                market = %self.name,
                policy = self.pricing.name(),
                transactions = transactions.len(),
                "book cleared"
            );
        }
        Ok(transactions)
    }

    fn transaction_events(transactions: Vec<Transaction>) -> Vec<MarketEvent> {
        transactions
            .into_iter()
            .map(|transaction| MarketEvent::Transaction {
                transaction,
                timestamp: Utc::now(),
            })
            .collect()
    }

    fn mark_closed(&mut self) -> MarketEvent {
        self.closed = true;
        info!(
            market = %self.name,
            round = self.clock.round,
            day = self.clock.day,
            "auction closed"
        );
        MarketEvent::AuctionClosed {
            round: self.clock.round,
            day: self.clock.day,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, RejectReason, Side};
    use crate::engine::FourHeapOrderBook;
    use crate::interfaces::{NoOpEventHandler, RecordingEventHandler};
    use crate::numeric::{NumericError, Price};
    use crate::policy::{
        AlwaysAcceptPolicy, DiscriminatoryPricingPolicy, MaxRoundsAuctionClosingCondition,
        MaxRoundsDayEndingCondition, QuoteBeatingPolicy, RoundClearingCondition,
        UniformPricingPolicy,
    };
    use rust_decimal::Decimal;

    fn price(value: i64) -> Price {
        Price::from_whole(value).unwrap()
    }

    fn cda(handler: Arc<dyn EventHandler>) -> Auctioneer {
        Auctioneer::new(
            "widgets".to_string(),
            Box::new(FourHeapOrderBook::new()),
            Box::new(DiscriminatoryPricingPolicy::new(Decimal::new(5, 1)).unwrap()),
            Box::new(AlwaysAcceptPolicy),
            handler,
        )
    }

    #[test]
    fn test_continuous_clearing() {
        let handler = Arc::new(RecordingEventHandler::new());
        let mut auctioneer = cda(handler.clone());

        let ask = Order::ask(AgentId(1), price(8), 2).unwrap();
        let events = auctioneer.submit(ask).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MarketEvent::OrderPlaced { .. }));

        let bid = Order::bid(AgentId(2), price(10), 2).unwrap();
        let events = auctioneer.submit(bid).unwrap();
        assert_eq!(events.len(), 2);

        let MarketEvent::Transaction { transaction, .. } = &events[1] else {
            panic!("expected a transaction, got {:?}", events[1]);
        };
        assert_eq!(transaction.price, price(9));
        assert_eq!(transaction.quantity, 2);
        assert_eq!(transaction.buyer, AgentId(2));
        assert_eq!(transaction.seller, AgentId(1));

        assert!(auctioneer.book().is_empty());
        assert_eq!(handler.transactions().len(), 1);
        assert_eq!(handler.len(), 3);
    }

    #[test]
    fn test_orders_are_stamped_in_arrival_order() {
        let mut auctioneer = cda(Arc::new(NoOpEventHandler));
        let first = Order::bid(AgentId(1), price(5), 1).unwrap().with_timestamp(99);
        let second = Order::bid(AgentId(2), price(5), 1).unwrap();
        let first_id = first.id();

        auctioneer.submit(first).unwrap();
        auctioneer.submit(second).unwrap();

        let top = auctioneer.book().highest_unmatched_bid().unwrap();
        assert_eq!(top.order_id(), first_id);
        assert_eq!(top.timestamp(), 0);
    }

    #[test]
    fn test_rejection() {
        let handler = Arc::new(RecordingEventHandler::new());
        let mut auctioneer = Auctioneer::new(
            "widgets".to_string(),
            Box::new(FourHeapOrderBook::new()),
            Box::new(DiscriminatoryPricingPolicy::new(Decimal::new(5, 1)).unwrap()),
            Box::new(QuoteBeatingPolicy),
            handler.clone(),
        );

        auctioneer
            .submit(Order::bid(AgentId(1), price(10), 1).unwrap())
            .unwrap();
        let weak = Order::bid(AgentId(2), price(10), 1).unwrap();
        let weak_id = weak.id();

        match auctioneer.submit(weak) {
            Err(MarketError::IllegalOrder { order_id, reason }) => {
                assert_eq!(order_id, weak_id);
                assert!(matches!(
                    reason,
                    RejectReason::NotAnImprovement { side: Side::Bid, .. }
                ));
            },
            other => panic!("expected rejection, got {:?}", other),
        }

        assert!(matches!(
            handler.events().last(),
            Some(MarketEvent::OrderRejected { .. })
        ));
        assert!(!auctioneer.book().contains(weak_id));
    }

    #[test]
    fn test_cancel() {
        let mut auctioneer = cda(Arc::new(NoOpEventHandler));
        let order = Order::bid(AgentId(1), price(10), 3).unwrap();
        let id = order.id();
        auctioneer.submit(order).unwrap();

        assert!(matches!(
            auctioneer.cancel(id),
            Some(MarketEvent::OrderCancelled {
                cancelled_quantity: 3,
                ..
            })
        ));
        assert!(auctioneer.cancel(id).is_none());
    }

    #[test]
    fn test_clearing_house_rounds() {
        let handler = Arc::new(RecordingEventHandler::new());
        let mut auctioneer = Auctioneer::new(
            "widgets".to_string(),
            Box::new(FourHeapOrderBook::new()),
            Box::new(UniformPricingPolicy::new(Decimal::new(5, 1)).unwrap()),
            Box::new(AlwaysAcceptPolicy),
            handler.clone(),
        )
        .with_clearing_condition(Box::new(RoundClearingCondition::new(2)));

        auctioneer
            .submit(Order::bid(AgentId(1), price(10), 1).unwrap())
            .unwrap();
        auctioneer
            .submit(Order::ask(AgentId(2), price(6), 1).unwrap())
            .unwrap();
        assert_eq!(auctioneer.book().matched_volume(), 1);

        // Round 1: no clearing yet
        let events = auctioneer.end_round().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(auctioneer.book().matched_volume(), 1);

        // Round 2: clears at the quote midpoint
        let events = auctioneer.end_round().unwrap();
        let transactions: Vec<&Transaction> = events
            .iter()
            .filter_map(|e| match e {
                MarketEvent::Transaction { transaction, .. } => Some(transaction),
                _ => None,
            })
            .collect();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].price, price(8));
        assert_eq!(transactions[0].round, 2);
        assert_eq!(handler.transactions().len(), 1);
    }

    #[test]
    fn test_days_and_closing() {
        let mut auctioneer = cda(Arc::new(NoOpEventHandler))
            .with_day_ending_condition(Box::new(MaxRoundsDayEndingCondition::new(2)))
            .with_closing_condition(Box::new(MaxRoundsAuctionClosingCondition::new(4)));

        let mut day_closes = 0;
        let mut closes = 0;
        for _ in 0..6 {
            for event in auctioneer.end_round().unwrap() {
                match event {
                    MarketEvent::DayClosed { .. } => day_closes += 1,
                    MarketEvent::AuctionClosed { .. } => closes += 1,
                    _ => {},
                }
            }
        }

        assert_eq!(day_closes, 2);
        assert_eq!(closes, 1);
        assert!(auctioneer.is_closed());
        assert_eq!(auctioneer.clock().round, 4);
        assert_eq!(auctioneer.clock().day, 2);

        assert_eq!(
            auctioneer.submit(Order::bid(AgentId(1), price(1), 1).unwrap()),
            Err(MarketError::AuctionClosed)
        );
        assert!(auctioneer.close().is_none());
    }

    #[test]
    fn test_explicit_clear() {
        let mut auctioneer = cda(Arc::new(NoOpEventHandler))
            .with_clearing_condition(Box::new(NeverClearingCondition));

        auctioneer
            .submit(Order::bid(AgentId(1), price(10), 4).unwrap())
            .unwrap();
        auctioneer
            .submit(Order::ask(AgentId(2), price(6), 3).unwrap())
            .unwrap();
        assert_eq!(auctioneer.quote().ask, Some(price(10)));

        let transactions = auctioneer.clear().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].quantity, 3);
        assert_eq!(transactions[0].price, price(8));
        assert!(auctioneer.clear().unwrap().is_empty());
        assert_eq!(auctioneer.book().depth(), 1);
    }

    struct OverflowingPricing;

    impl PricingPolicy for OverflowingPricing {
        fn determine_clearing_price(
            &mut self,
            _bid: &crate::domain::OrderFragment,
            _ask: &crate::domain::OrderFragment,
            _quote: &MarketQuote,
        ) -> NumericResult<Price> {
            Err(NumericError::Overflow)
        }

        fn name(&self) -> &str {
            "Overflowing"
        }
    }

    #[test]
    fn test_pricing_failure_keeps_book_and_events() {
        let handler = Arc::new(RecordingEventHandler::new());
        let mut auctioneer = Auctioneer::new(
            "widgets".to_string(),
            Box::new(FourHeapOrderBook::new()),
            Box::new(OverflowingPricing),
            Box::new(AlwaysAcceptPolicy),
            handler.clone(),
        );

        auctioneer
            .submit(Order::ask(AgentId(1), price(8), 2).unwrap())
            .unwrap();
        let bid = Order::bid(AgentId(2), price(10), 2).unwrap();
        let bid_id = bid.id();

        let result = auctioneer.submit(bid);
        assert!(matches!(result, Err(MarketError::InvalidPrice(NumericError::Overflow))));

        // The matched pair survives the failed clear
        assert!(auctioneer.book().contains(bid_id));
        assert_eq!(auctioneer.book().matched_volume(), 2);
        assert!(matches!(auctioneer.clear(), Err(NumericError::Overflow)));
        assert_eq!(auctioneer.book().matched_volume(), 2);

        let events = handler.take();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, MarketEvent::OrderPlaced { .. })));
        assert!(matches!(
            &events[1],
            MarketEvent::OrderPlaced { order_id, .. } if *order_id == bid_id
        ));
    }
}

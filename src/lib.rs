// ============================================================================
// Double Auction Library
// Four-heap order book with pluggable pricing, acceptance and clearing
// ============================================================================

//! # Double Auction
//!
//! A four-heap double-auction order book and the auctioneer that drives it.
//!
//! ## Features
//!
//! - **Four-heap book** that keeps the currently matchable volume paired at all times
//! - **Fragment chains** for partially matched orders
//! - **Pluggable policies** for pricing (k, uniform, N-period), admission and clearing
//! - **Auction clock** with rounds, days and closing conditions
//! - **Event sourcing** for transactions and order lifecycle
//!
//! ## Example
//!
//! ```rust
//! use double_auction::prelude::*;
//! use double_auction::numeric::Price;
//! use std::sync::Arc;
//!
//! // Continuous double auction: midpoint pricing, clears on every order
//! let mut auctioneer = AuctioneerBuilder::new("widgets")
//!     .always_accept()
//!     .build(Arc::new(NoOpEventHandler))
//!     .unwrap();
//!
//! auctioneer
//!     .submit(Order::ask(AgentId(1), Price::from_whole(95).unwrap(), 10).unwrap())
//!     .unwrap();
//! let events = auctioneer
//!     .submit(Order::bid(AgentId(2), Price::from_whole(105).unwrap(), 4).unwrap())
//!     .unwrap();
//!
//! // One transaction at 100 for 4 units, 6 units of the ask keep waiting
//! assert!(events.iter().any(|e| matches!(e, MarketEvent::Transaction { .. })));
//! println!("Quote: {:?}", auctioneer.quote());
//! ```

pub mod collections;
pub mod domain;
pub mod engine;
pub mod interfaces;
pub mod numeric;
pub mod policy;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        AcceptancePolicyType, AgentId, AuctionClock, ClearingConditionType, ComparatorType,
        MarketConfig, MarketError, MarketQuote, MatchedPair, Order, OrderFragment, OrderId,
        PricingPolicyType, RejectReason, Side, Transaction,
    };
    pub use crate::engine::{
        create_from_config, Auctioneer, AuctioneerBuilder, FourHeapOrderBook, TickOrderBook,
    };
    pub use crate::interfaces::{
        Acceptance, AcceptancePolicy, EventHandler, LoggingEventHandler, MarketEvent,
        MarketTrigger, NoOpEventHandler, OrderBook, PricingPolicy, RecordingEventHandler,
        TimingCondition, TimingContext,
    };
    pub use crate::policy::{
        AlwaysAcceptPolicy, DiscriminatoryPricingPolicy, NPricingPolicy, QuoteBeatingPolicy,
        ShoutTypeBasedPolicy, UniformPricingPolicy,
    };
}

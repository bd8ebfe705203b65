// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod clock;
pub mod config;
pub mod error;
pub mod order;
pub mod quote;
pub mod transaction;

pub use clock::AuctionClock;
pub use config::{
    AcceptancePolicyType, ClearingConditionType, ComparatorType, MarketConfig, PricingPolicyType,
};
pub use error::{MarketError, RejectReason};
pub use order::{
    AgentId, FragmentChain, FragmentId, MatchedPair, Order, OrderFragment, OrderId, PriorityKey,
    Side,
};
pub use quote::MarketQuote;
pub use transaction::Transaction;

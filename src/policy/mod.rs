// ============================================================================
// Policy Module
// Pricing, acceptance and timing strategies layered on the order book
// ============================================================================

mod acceptance;
mod pricing;
mod timing;

pub use acceptance::{AlwaysAcceptPolicy, QuoteBeatingPolicy, ShoutTypeBasedPolicy};
pub use pricing::{DiscriminatoryPricingPolicy, KPricing, NPricingPolicy, UniformPricingPolicy};
pub use timing::{
    CombiOp, CombiTimingCondition, MaxDaysAuctionClosingCondition,
    MaxRoundsAuctionClosingCondition, MaxRoundsDayEndingCondition, NeverClearingCondition,
    OrderPlacedClearingCondition, ProbabilisticClearingCondition, RoundClearingCondition,
};

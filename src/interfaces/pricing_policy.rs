// ============================================================================
// Pricing Policy Interface
// ============================================================================

use crate::domain::{MarketQuote, OrderFragment};
use crate::numeric::{NumericResult, Price};

/// Computes the price a matched bid/ask pair transacts at
/// Implementations: Discriminatory, Uniform, NPeriod
pub trait PricingPolicy: Send {
    /// Price for one matched pair given the quote taken before harvesting.
    ///
    /// Implementations may keep state, so every call counts as a transaction.
    fn determine_clearing_price(
        &mut self,
        bid: &OrderFragment,
        ask: &OrderFragment,
        quote: &MarketQuote,
    ) -> NumericResult<Price>;

    /// Get the policy name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Pricing Policies
// k-interval pricing for matched bid/ask pairs
// ============================================================================

use crate::domain::{MarketQuote, OrderFragment};
use crate::interfaces::PricingPolicy;
use crate::numeric::{NumericError, NumericResult, Price};
use rust_decimal::Decimal;
use std::collections::VecDeque;

// ============================================================================
// k-interval
// ============================================================================

/// Linear interpolation between two prices.
///
/// `k = 0` picks the lower end `a`, `k = 1` the upper end `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KPricing {
    k: Decimal,
}

impl KPricing {
    /// # Errors
    /// `InvalidInput` when `k` lies outside `[0, 1]`
    pub fn new(k: Decimal) -> NumericResult<Self> {
        if k < Decimal::ZERO || k > Decimal::ONE {
            return Err(NumericError::InvalidInput);
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> Decimal {
        self.k
    }

    /// `k*b + (1-k)*a`, at the finer of the two exponents
    pub fn k_interval(&self, a: Price, b: Price) -> NumericResult<Price> {
        let exponent = a.exponent().max(b.exponent());
        let upper = self
            .k
            .checked_mul(b.to_decimal())
            .ok_or(NumericError::Overflow)?;
        let lower = (Decimal::ONE - self.k)
            .checked_mul(a.to_decimal())
            .ok_or(NumericError::Overflow)?;
        let value = upper.checked_add(lower).ok_or(NumericError::Overflow)?;
        Price::from_decimal(value, exponent)
    }
}

// ============================================================================
// Discriminatory
// ============================================================================

/// Each pair trades inside its own bid/ask interval
#[derive(Debug, Clone)]
pub struct DiscriminatoryPricingPolicy {
    pricing: KPricing,
}

impl DiscriminatoryPricingPolicy {
    pub fn new(k: Decimal) -> NumericResult<Self> {
        Ok(Self {
            pricing: KPricing::new(k)?,
        })
    }

    pub fn k(&self) -> Decimal {
        self.pricing.k()
    }
}

impl PricingPolicy for DiscriminatoryPricingPolicy {
    fn determine_clearing_price(
        &mut self,
        bid: &OrderFragment,
        ask: &OrderFragment,
        _quote: &MarketQuote,
    ) -> NumericResult<Price> {
        debug_assert!(bid.price() >= ask.price(), "pair does not cross");
        self.pricing.k_interval(ask.price(), bid.price())
    }

    fn name(&self) -> &str {
        "Discriminatory"
    }
}

// ============================================================================
// Uniform
// ============================================================================

/// Every pair of a clearing trades inside the market quote interval.
///
/// A quote side that is missing falls back to the pair's own price.
#[derive(Debug, Clone)]
pub struct UniformPricingPolicy {
    pricing: KPricing,
}

impl UniformPricingPolicy {
    pub fn new(k: Decimal) -> NumericResult<Self> {
        Ok(Self {
            pricing: KPricing::new(k)?,
        })
    }

    pub fn k(&self) -> Decimal {
        self.pricing.k()
    }
}

impl PricingPolicy for UniformPricingPolicy {
    fn determine_clearing_price(
        &mut self,
        bid: &OrderFragment,
        ask: &OrderFragment,
        quote: &MarketQuote,
    ) -> NumericResult<Price> {
        let low = quote.ask.unwrap_or_else(|| ask.price());
        let high = quote.bid.unwrap_or_else(|| bid.price());
        self.pricing.k_interval(low, high)
    }

    fn name(&self) -> &str {
        "Uniform"
    }
}

// ============================================================================
// N-period average
// ============================================================================

/// Mean of the last `n` transacted bid/ask price pairs, kept inside the
/// current pair's interval.
#[derive(Debug, Clone)]
pub struct NPricingPolicy {
    n: usize,
    history: VecDeque<Price>,
}

impl NPricingPolicy {
    /// # Errors
    /// `InvalidInput` when `n` is zero
    pub fn new(n: usize) -> NumericResult<Self> {
        if n == 0 {
            return Err(NumericError::InvalidInput);
        }
        Ok(Self {
            n,
            history: VecDeque::with_capacity(2 * n),
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Prices in the window, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Price> + '_ {
        self.history.iter()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn record(&mut self, price: Price) {
        self.history.push_back(price);
        while self.history.len() > 2 * self.n {
            self.history.pop_front();
        }
    }

    fn mean(&self) -> NumericResult<Decimal> {
        let mut sum = Decimal::ZERO;
        for price in &self.history {
            sum = sum
                .checked_add(price.to_decimal())
                .ok_or(NumericError::Overflow)?;
        }
        sum.checked_div(Decimal::from(self.history.len()))
            .ok_or(NumericError::InvalidInput)
    }
}

impl PricingPolicy for NPricingPolicy {
    fn determine_clearing_price(
        &mut self,
        bid: &OrderFragment,
        ask: &OrderFragment,
        _quote: &MarketQuote,
    ) -> NumericResult<Price> {
        self.record(bid.price());
        self.record(ask.price());

        let exponent = bid.price().exponent().max(ask.price().exponent());
        let mean = Price::from_decimal(self.mean()?, exponent)?;
        Ok(mean.max(ask.price()).min(bid.price()))
    }

    fn name(&self) -> &str {
        "NPeriod"
    }
}

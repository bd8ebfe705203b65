// ============================================================================
// Timing Conditions
// When to clear the book, end a trading day or close the auction
// ============================================================================

use crate::interfaces::{MarketTrigger, TimingCondition, TimingContext};
use crate::numeric::{NumericError, NumericResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Clearing Conditions
// ============================================================================

/// Clears after every accepted order (continuous double auction)
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPlacedClearingCondition;

impl TimingCondition for OrderPlacedClearingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        ctx.trigger == MarketTrigger::OrderPlaced
    }

    fn name(&self) -> &str {
        "OrderPlaced"
    }
}

/// Clears at the end of every `n`-th round (clearing house)
#[derive(Debug, Clone, Copy)]
pub struct RoundClearingCondition {
    every_n_rounds: u64,
}

impl RoundClearingCondition {
    /// A zero interval is treated as one
    pub fn new(every_n_rounds: u64) -> Self {
        Self {
            every_n_rounds: every_n_rounds.max(1),
        }
    }

    pub fn every_round() -> Self {
        Self::new(1)
    }

    pub fn every_n_rounds(&self) -> u64 {
        self.every_n_rounds
    }
}

impl TimingCondition for RoundClearingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        ctx.trigger == MarketTrigger::RoundClosed && ctx.clock.round % self.every_n_rounds == 0
    }

    fn name(&self) -> &str {
        "EveryNRounds"
    }
}

/// Clears after an accepted order with probability `threshold`.
///
/// `threshold = 1` behaves like a continuous double auction and
/// `threshold = 0` like a call market.
#[derive(Debug, Clone)]
pub struct ProbabilisticClearingCondition<R: Rng = StdRng> {
    threshold: f64,
    rng: R,
}

impl<R: Rng> ProbabilisticClearingCondition<R> {
    /// # Errors
    /// `InvalidInput` when `threshold` lies outside `[0, 1]`
    pub fn new(threshold: f64, rng: R) -> NumericResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(NumericError::InvalidInput);
        }
        Ok(Self { threshold, rng })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl ProbabilisticClearingCondition<StdRng> {
    /// Deterministic condition for reproducible runs
    pub fn seeded(threshold: f64, seed: u64) -> NumericResult<Self> {
        Self::new(threshold, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> TimingCondition for ProbabilisticClearingCondition<R> {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        if ctx.trigger != MarketTrigger::OrderPlaced {
            return false;
        }
        self.rng.gen::<f64>() < self.threshold
    }

    fn name(&self) -> &str {
        "Probabilistic"
    }
}

/// Never fires; clearing happens only when the driver asks (call market)
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverClearingCondition;

impl TimingCondition for NeverClearingCondition {
    fn eval(&mut self, _ctx: &TimingContext<'_>) -> bool {
        false
    }

    fn name(&self) -> &str {
        "Never"
    }
}

// ============================================================================
// Closing and Day-Ending Conditions
// ============================================================================

/// True once `max_rounds` rounds have closed
#[derive(Debug, Clone, Copy)]
pub struct MaxRoundsAuctionClosingCondition {
    max_rounds: u64,
}

impl MaxRoundsAuctionClosingCondition {
    pub fn new(max_rounds: u64) -> Self {
        Self { max_rounds }
    }
}

impl TimingCondition for MaxRoundsAuctionClosingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        ctx.clock.round >= self.max_rounds
    }

    fn name(&self) -> &str {
        "MaxRounds"
    }
}

/// True once `max_days` days have closed
#[derive(Debug, Clone, Copy)]
pub struct MaxDaysAuctionClosingCondition {
    max_days: u64,
}

impl MaxDaysAuctionClosingCondition {
    pub fn new(max_days: u64) -> Self {
        Self { max_days }
    }
}

impl TimingCondition for MaxDaysAuctionClosingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        ctx.clock.day >= self.max_days
    }

    fn name(&self) -> &str {
        "MaxDays"
    }
}

/// True once `max_rounds` rounds have closed within the current day
#[derive(Debug, Clone, Copy)]
pub struct MaxRoundsDayEndingCondition {
    max_rounds: u64,
}

impl MaxRoundsDayEndingCondition {
    pub fn new(max_rounds: u64) -> Self {
        Self { max_rounds }
    }
}

impl TimingCondition for MaxRoundsDayEndingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        ctx.clock.round_in_day >= self.max_rounds
    }

    fn name(&self) -> &str {
        "MaxRoundsPerDay"
    }
}

// ============================================================================
// Composite
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiOp {
    And,
    Or,
}

/// AND/OR over sub-conditions, evaluated in order with short-circuiting.
///
/// An empty AND is true and an empty OR is false.
pub struct CombiTimingCondition {
    op: CombiOp,
    conditions: Vec<Box<dyn TimingCondition>>,
}

impl CombiTimingCondition {
    pub fn new(op: CombiOp) -> Self {
        Self {
            op,
            conditions: Vec::new(),
        }
    }

    pub fn all(conditions: Vec<Box<dyn TimingCondition>>) -> Self {
        Self {
            op: CombiOp::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Box<dyn TimingCondition>>) -> Self {
        Self {
            op: CombiOp::Or,
            conditions,
        }
    }

    /// Builder method: Append a sub-condition
    pub fn with(mut self, condition: Box<dyn TimingCondition>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: Box<dyn TimingCondition>) {
        self.conditions.push(condition);
    }

    pub fn op(&self) -> CombiOp {
        self.op
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl TimingCondition for CombiTimingCondition {
    fn eval(&mut self, ctx: &TimingContext<'_>) -> bool {
        match self.op {
            CombiOp::And => self.conditions.iter_mut().all(|c| c.eval(ctx)),
            CombiOp::Or => self.conditions.iter_mut().any(|c| c.eval(ctx)),
        }
    }

    fn name(&self) -> &str {
        match self.op {
            CombiOp::And => "All",
            CombiOp::Or => "Any",
        }
    }
}

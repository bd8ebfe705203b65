// ============================================================================
// Acceptance Policies
// Admission rules checked before an order is added to the book
// ============================================================================

use crate::domain::{MarketQuote, Order, RejectReason, Side};
use crate::interfaces::{Acceptance, AcceptancePolicy};
use crate::numeric::{NumericError, NumericResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Admits every order
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAcceptPolicy;

impl AcceptancePolicy for AlwaysAcceptPolicy {
    fn check(&mut self, _order: &Order, _quote: &MarketQuote) -> Acceptance {
        Acceptance::Accepted
    }

    fn name(&self) -> &str {
        "AlwaysAccept"
    }
}

/// Improvement rule: a new bid must beat the bid quote and a new ask must
/// undercut the ask quote. An empty quote side admits anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteBeatingPolicy;

impl AcceptancePolicy for QuoteBeatingPolicy {
    fn check(&mut self, order: &Order, quote: &MarketQuote) -> Acceptance {
        let improves = match order.side() {
            Side::Bid => quote.bid.map_or(true, |best| order.price() > best),
            Side::Ask => quote.ask.map_or(true, |best| order.price() < best),
        };
        if improves {
            return Acceptance::Accepted;
        }

        match RejectReason::not_an_improvement(order.side(), order.price(), quote) {
            Some(reason) => {
                trace!(order_id = %order.id(), %reason, "order does not beat the quote");
                Acceptance::Rejected(reason)
            },
            None => Acceptance::Accepted,
        }
    }

    fn name(&self) -> &str {
        "QuoteBeating"
    }
}

/// Lets one side through per check: bids with probability `q`, asks otherwise.
#[derive(Debug, Clone)]
pub struct ShoutTypeBasedPolicy<R: Rng = StdRng> {
    q: f64,
    rng: R,
}

impl<R: Rng> ShoutTypeBasedPolicy<R> {
    /// # Errors
    /// `InvalidInput` when `q` lies outside `[0, 1]`
    pub fn new(q: f64, rng: R) -> NumericResult<Self> {
        if !(0.0..=1.0).contains(&q) {
            return Err(NumericError::InvalidInput);
        }
        Ok(Self { q, rng })
    }

    pub fn q(&self) -> f64 {
        self.q
    }
}

impl ShoutTypeBasedPolicy<StdRng> {
    /// Deterministic policy for reproducible runs
    pub fn seeded(q: f64, seed: u64) -> NumericResult<Self> {
        Self::new(q, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> AcceptancePolicy for ShoutTypeBasedPolicy<R> {
    fn check(&mut self, order: &Order, _quote: &MarketQuote) -> Acceptance {
        let draw: f64 = self.rng.gen();
        let permitted = if draw < self.q { Side::Bid } else { Side::Ask };

        if order.side() == permitted {
            Acceptance::Accepted
        } else {
            Acceptance::Rejected(RejectReason::SideNotPermitted { side: order.side() })
        }
    }

    fn name(&self) -> &str {
        "ShoutTypeBased"
    }
}

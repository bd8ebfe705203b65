// ============================================================================
// Acceptance Policy Interface
// Admission control evaluated before an order reaches the book
// ============================================================================

use crate::domain::{MarketQuote, Order, RejectReason};

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    Rejected(RejectReason),
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Acceptance::Accepted)
    }
}

/// Decides whether an order may enter the book
/// Implementations: AlwaysAccept, QuoteBeating, ShoutTypeBased
pub trait AcceptancePolicy: Send {
    fn check(&mut self, order: &Order, quote: &MarketQuote) -> Acceptance;

    /// Get the policy name for logging
    fn name(&self) -> &str;
}

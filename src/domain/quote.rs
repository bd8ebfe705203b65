// ============================================================================
// Market Quote
// ============================================================================

use crate::numeric::{NumericResult, Price};
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bid/ask quote derived from the four heaps.
///
/// `ask` is the price a new bid must reach to trade now and `bid` is the
/// price a new ask must undercut. Either side is `None` on an empty book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarketQuote {
    pub bid: Option<Price>,
    pub ask: Option<Price>,
}

impl MarketQuote {
    pub fn new(bid: Option<Price>, ask: Option<Price>) -> Self {
        Self { bid, ask }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Current spread (ask - bid)
    pub fn spread(&self) -> Option<NumericResult<Price>> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask.checked_sub(bid)),
            _ => None,
        }
    }

    /// Midpoint of the quote, exact
    pub fn midpoint(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid.to_decimal() + ask.to_decimal()) / Decimal::from(2)),
            _ => None,
        }
    }

    /// True when the bid quote is above the ask quote
    pub fn is_crossed(&self) -> bool {
        matches!((self.bid, self.ask), (Some(bid), Some(ask)) if bid > ask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_spread_and_midpoint() {
        let quote = MarketQuote::new(
            Some(Price::from_whole(10).unwrap()),
            Some(Price::from_whole(12).unwrap()),
        );

        assert_eq!(quote.spread().unwrap().unwrap(), Price::from_whole(2).unwrap());
        assert_eq!(quote.midpoint(), Some(Decimal::from(11)));
        assert!(!quote.is_crossed());
    }

    #[test]
    fn test_empty_quote() {
        let quote = MarketQuote::empty();
        assert!(quote.spread().is_none());
        assert!(quote.midpoint().is_none());
        assert!(!quote.is_crossed());
    }
}

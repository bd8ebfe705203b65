// ============================================================================
// Market Errors
// Recoverable failures surfaced to the caller of the book or auctioneer
// ============================================================================

use super::order::{OrderId, Side};
use super::quote::MarketQuote;
use crate::numeric::{NumericError, Price};
use std::fmt;

/// Why an acceptance policy turned an order away.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// The order does not strictly improve on the current quote for its side
    NotAnImprovement {
        side: Side,
        price: Price,
        quote: Price,
    },
    /// Orders on this side are not being taken right now
    SideNotPermitted { side: Side },
}

impl RejectReason {
    pub(crate) fn not_an_improvement(side: Side, price: Price, quote: &MarketQuote) -> Option<Self> {
        let quoted = match side {
            Side::Bid => quote.bid?,
            Side::Ask => quote.ask?,
        };
        Some(RejectReason::NotAnImprovement {
            side,
            price,
            quote: quoted,
        })
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotAnImprovement { side, price, quote } => write!(
                f,
                "{} at {} does not improve on the quote {}",
                side, price, quote
            ),
            RejectReason::SideNotPermitted { side } => {
                write!(f, "{} orders are not accepted at this time", side)
            },
        }
    }
}

/// Errors returned by order construction, the order book and the auctioneer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// The order is already live in the book
    DuplicateOrder(OrderId),
    /// The acceptance policy rejected the order
    IllegalOrder {
        order_id: OrderId,
        reason: RejectReason,
    },
    /// A price could not be built from external input
    InvalidPrice(NumericError),
    /// Order prices must not be negative
    NegativePrice(Price),
    /// Order quantities must be positive
    InvalidQuantity,
    /// The auction has closed and takes no more orders
    AuctionClosed,
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::DuplicateOrder(id) => write!(f, "Duplicate order: {}", id),
            MarketError::IllegalOrder { order_id, reason } => {
                write!(f, "Illegal order {}: {}", order_id, reason)
            },
            MarketError::InvalidPrice(err) => write!(f, "Invalid price: {}", err),
            MarketError::NegativePrice(price) => write!(f, "Negative price: {}", price),
            MarketError::InvalidQuantity => write!(f, "Quantity must be positive"),
            MarketError::AuctionClosed => write!(f, "Auction is closed"),
        }
    }
}

impl std::error::Error for MarketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MarketError::InvalidPrice(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NumericError> for MarketError {
    fn from(err: NumericError) -> Self {
        MarketError::InvalidPrice(err)
    }
}

// ============================================================================
// Transaction Domain Model
// ============================================================================

use crate::numeric::{NumericResult, Price, Quantity};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AgentId, MatchedPair, OrderId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One executed bid/ask pair at its clearing price
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transaction {
    /// Unique transaction identifier
    pub id: Uuid,

    /// Order the buyer submitted
    pub bid_order: OrderId,

    /// Order the seller submitted
    pub ask_order: OrderId,

    pub buyer: AgentId,
    pub seller: AgentId,

    /// Clearing price chosen by the pricing policy
    pub price: Price,

    /// Executed quantity
    pub quantity: Quantity,

    /// Auction round in which the pair was cleared
    pub round: u64,

    /// Trading day in which the pair was cleared
    pub day: u64,

    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(pair: &MatchedPair, price: Price, round: u64, day: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            bid_order: pair.bid.order_id(),
            ask_order: pair.ask.order_id(),
            buyer: pair.bid.agent(),
            seller: pair.ask.agent(),
            price,
            quantity: pair.quantity(),
            round,
            day,
            timestamp: Utc::now(),
        }
    }

    /// Calculate the notional value of the transaction (price * quantity)
    ///
    /// Returns a Result because multiplication can overflow.
    pub fn notional_value(&self) -> NumericResult<Price> {
        self.price.checked_mul_int(self.quantity as i64)
    }
}

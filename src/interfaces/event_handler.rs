// ============================================================================
// Event Handler Interface
// Defines the contract for handling order and transaction events
// ============================================================================

use crate::domain::{AgentId, OrderId, RejectReason, Side, Transaction};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the auctioneer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarketEvent {
    /// Order accepted and inserted into the book
    OrderPlaced {
        order_id: OrderId,
        agent: AgentId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: DateTime<Utc>,
    },

    /// Order turned away by the acceptance policy
    OrderRejected {
        order_id: OrderId,
        reason: RejectReason,
        timestamp: DateTime<Utc>,
    },

    /// Remaining chain of an order withdrawn from the book
    OrderCancelled {
        order_id: OrderId,
        cancelled_quantity: Quantity,
        timestamp: DateTime<Utc>,
    },

    /// A matched pair executed; both agents are notified through this event
    Transaction {
        transaction: Transaction,
        timestamp: DateTime<Utc>,
    },

    /// A trading round finished
    RoundClosed {
        round: u64,
        timestamp: DateTime<Utc>,
    },

    /// A trading day finished
    DayClosed {
        day: u64,
        timestamp: DateTime<Utc>,
    },

    /// The auction stopped taking orders
    AuctionClosed {
        round: u64,
        day: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Event handler trait for processing auctioneer events
/// Implementations can handle logging, agent notification, recording, etc.
pub trait EventHandler: Send + Sync {
    /// Handle a market event
    fn on_event(&self, event: MarketEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<MarketEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: MarketEvent) {}
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: MarketEvent) {
        tracing::debug!("Auction event: {:?}", event);
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<MarketEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<MarketEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Recorded transactions only
    pub fn transactions(&self) -> Vec<Transaction> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                MarketEvent::Transaction { transaction, .. } => Some(transaction.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: MarketEvent) {
        self.events.lock().push(event);
    }

    fn on_events(&self, events: Vec<MarketEvent>) {
        self.events.lock().extend(events);
    }
}

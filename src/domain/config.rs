// ============================================================================
// Market Configuration
// Book priority, pricing, acceptance and clearing choices for one market
// ============================================================================

use crate::numeric::MAX_EXPONENT;
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Priority
// ============================================================================

/// Ranking used inside each of the four heaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ComparatorType {
    /// Best price first, then larger quantity, then earlier timestamp
    #[default]
    PriceTime,

    /// Larger quantity first, then best price, then earlier timestamp
    /// Use case: markets that reward size with queue priority
    VolumePriority,
}

// ============================================================================
// Pricing Policy Type
// ============================================================================

/// How a matched bid/ask pair is priced
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PricingPolicyType {
    /// Each pair trades at `k*bid + (1-k)*ask` of its own prices
    Discriminatory { k: Decimal },

    /// Every pair in a clearing trades at `k*quote.bid + (1-k)*quote.ask`
    Uniform { k: Decimal },

    /// Mean of the last `2n` transacted bid/ask prices, clamped to the pair
    NPeriod { n: usize },
}

// ============================================================================
// Acceptance Policy Type
// ============================================================================

/// Admission control applied before an order reaches the book
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AcceptancePolicyType {
    AlwaysAccept,

    /// New bids must beat the bid quote, new asks must undercut the ask quote
    /// Use case: NYSE-style improvement rule in continuous markets
    QuoteBeating,

    /// Bids admitted with probability `q`, asks with probability `1 - q`
    /// Use case: experimental protocols that control bid/ask arrival
    ShoutTypeBased { q: f64 },
}

// ============================================================================
// Clearing Condition Type
// ============================================================================

/// When the book is cleared
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClearingConditionType {
    /// Clear after every accepted order (continuous double auction)
    EveryOrder,

    /// Clear at the end of every `n`-th round (call market / clearing house)
    EveryNRounds { n: u64 },

    /// Clear after an accepted order with probability `threshold`
    Probabilistic { threshold: f64 },

    /// Only clear when the driver asks for it
    Never,
}

// ============================================================================
// Complete Market Configuration
// ============================================================================

/// Comprehensive configuration for one auction market
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarketConfig {
    /// The market name, used in logs
    pub name: String,

    pub comparator: ComparatorType,

    pub pricing: PricingPolicyType,

    pub acceptance: AcceptancePolicyType,

    pub clearing: ClearingConditionType,

    /// Optional: decimal places prices are rounded to before entering the book
    /// None means prices are used as submitted
    pub tick_decimals: Option<u8>,

    /// Optional: close the auction after this many rounds
    pub max_rounds: Option<u64>,

    /// Optional: close the auction after this many days
    pub max_days: Option<u64>,

    /// Optional: end the trading day after this many rounds
    pub rounds_per_day: Option<u64>,

    /// Optional: seed for randomised policies
    /// None means seeded from system entropy
    pub seed: Option<u64>,
}

impl MarketConfig {
    /// Create a new configuration with required parameters
    pub fn new(
        name: String,
        pricing: PricingPolicyType,
        acceptance: AcceptancePolicyType,
        clearing: ClearingConditionType,
    ) -> Self {
        Self {
            name,
            comparator: ComparatorType::PriceTime,
            pricing,
            acceptance,
            clearing,
            tick_decimals: None,
            max_rounds: None,
            max_days: None,
            rounds_per_day: None,
            seed: None,
        }
    }

    /// Builder method: Set the heap ordering
    pub fn with_comparator(mut self, comparator: ComparatorType) -> Self {
        self.comparator = comparator;
        self
    }

    /// Builder method: Round prices to a tick
    pub fn with_tick_decimals(mut self, decimals: u8) -> Self {
        self.tick_decimals = Some(decimals);
        self
    }

    /// Builder method: Close after a number of rounds
    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Builder method: Close after a number of days
    pub fn with_max_days(mut self, days: u64) -> Self {
        self.max_days = Some(days);
        self
    }

    /// Builder method: Set the length of a trading day
    pub fn with_rounds_per_day(mut self, rounds: u64) -> Self {
        self.rounds_per_day = Some(rounds);
        self
    }

    /// Builder method: Seed randomised policies
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Market name cannot be empty".to_string());
        }

        match &self.pricing {
            PricingPolicyType::Discriminatory { k } | PricingPolicyType::Uniform { k } => {
                if *k < Decimal::ZERO || *k > Decimal::ONE {
                    return Err("Pricing parameter k must be between 0 and 1".to_string());
                }
            },
            PricingPolicyType::NPeriod { n } => {
                if *n == 0 {
                    return Err("N-period pricing window must be positive".to_string());
                }
            },
        }

        if let AcceptancePolicyType::ShoutTypeBased { q } = self.acceptance {
            if !(0.0..=1.0).contains(&q) {
                return Err("Shout type mixture q must be between 0 and 1".to_string());
            }
        }

        match self.clearing {
            ClearingConditionType::EveryNRounds { n } if n == 0 => {
                return Err("Clearing interval must be at least one round".to_string());
            },
            ClearingConditionType::Probabilistic { threshold }
                if !(0.0..=1.0).contains(&threshold) =>
            {
                return Err("Clearing threshold must be between 0 and 1".to_string());
            },
            _ => {},
        }

        if let Some(decimals) = self.tick_decimals {
            if decimals > MAX_EXPONENT {
                return Err(format!("Tick decimals cannot exceed {}", MAX_EXPONENT));
            }
        }

        if self.max_rounds == Some(0) || self.max_days == Some(0) {
            return Err("Auction length must be positive".to_string());
        }

        if self.rounds_per_day == Some(0) {
            return Err("A trading day needs at least one round".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Preset Configurations (Factory Methods)
// ============================================================================

impl MarketConfig {
    /// Continuous double auction
    /// - Clears on every accepted order
    /// - Discriminatory pricing at the midpoint of each pair
    /// - Improvement rule on incoming orders
    pub fn continuous_double_auction(name: String) -> Self {
        Self::new(
            name,
            PricingPolicyType::Discriminatory {
                k: Decimal::new(5, 1),
            },
            AcceptancePolicyType::QuoteBeating,
            ClearingConditionType::EveryOrder,
        )
    }

    /// Call market
    /// - Orders accumulate until the driver clears explicitly
    /// - Uniform pricing at the quote midpoint
    pub fn call_market(name: String) -> Self {
        Self::new(
            name,
            PricingPolicyType::Uniform {
                k: Decimal::new(5, 1),
            },
            AcceptancePolicyType::AlwaysAccept,
            ClearingConditionType::Never,
        )
    }

    /// Clearing house
    /// - Clears at the end of every `rounds`-th round
    /// - Uniform pricing at the quote midpoint
    pub fn clearing_house(name: String, rounds: u64) -> Self {
        Self::new(
            name,
            PricingPolicyType::Uniform {
                k: Decimal::new(5, 1),
            },
            AcceptancePolicyType::AlwaysAccept,
            ClearingConditionType::EveryNRounds { n: rounds },
        )
    }

    /// Randomly timed clearing between a CDA (threshold 1) and a call market (threshold 0)
    pub fn probabilistic(name: String, threshold: f64) -> Self {
        Self::new(
            name,
            PricingPolicyType::Discriminatory {
                k: Decimal::new(5, 1),
            },
            AcceptancePolicyType::AlwaysAccept,
            ClearingConditionType::Probabilistic { threshold },
        )
    }
}

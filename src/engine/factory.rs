// ============================================================================
// Auctioneer Factory
// Creates auctioneers with book, policies and timing wired from configuration
// ============================================================================

use crate::domain::config::{
    AcceptancePolicyType, ClearingConditionType, ComparatorType, MarketConfig, PricingPolicyType,
};
use crate::engine::{comparator_for, Auctioneer, FourHeapOrderBook, TickOrderBook};
use crate::interfaces::{
    AcceptancePolicy, EventHandler, OrderBook, PricingPolicy, TimingCondition,
};
use crate::policy::{
    AlwaysAcceptPolicy, CombiOp, CombiTimingCondition, DiscriminatoryPricingPolicy,
    MaxDaysAuctionClosingCondition, MaxRoundsAuctionClosingCondition,
    MaxRoundsDayEndingCondition, NPricingPolicy, NeverClearingCondition,
    OrderPlacedClearingCondition, ProbabilisticClearingCondition, QuoteBeatingPolicy,
    RoundClearingCondition, ShoutTypeBasedPolicy, UniformPricingPolicy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::sync::Arc;

// Independent random streams derived from one seed
const ACCEPTANCE_STREAM: u64 = 1;
const CLEARING_STREAM: u64 = 2;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates an auctioneer from configuration
///
/// # Arguments
/// * `config` - Market configuration
/// * `event_handler` - Event handler for order and transaction events
///
/// # Returns
/// * `Result<Auctioneer, String>` - Configured auctioneer or error
///
/// # Example
/// ```
/// use double_auction::prelude::*;
/// use double_auction::engine::factory::create_from_config;
/// use std::sync::Arc;
///
/// let config = MarketConfig::continuous_double_auction("widgets".to_string());
/// let auctioneer = create_from_config(config, Arc::new(NoOpEventHandler)).unwrap();
/// assert_eq!(auctioneer.name(), "widgets");
/// ```
pub fn create_from_config(
    config: MarketConfig,
    event_handler: Arc<dyn EventHandler>,
) -> Result<Auctioneer, String> {
    // Validate configuration first
    config.validate()?;

    let book = create_order_book(config.comparator, config.tick_decimals);
    let pricing = create_pricing_policy(&config.pricing)?;
    let acceptance = create_acceptance_policy(&config.acceptance, rng_for(config.seed, ACCEPTANCE_STREAM))?;
    let clearing = create_clearing_condition(&config.clearing, rng_for(config.seed, CLEARING_STREAM))?;

    let day_ending: Box<dyn TimingCondition> = match config.rounds_per_day {
        Some(rounds) => Box::new(MaxRoundsDayEndingCondition::new(rounds)),
        None => Box::new(NeverClearingCondition),
    };

    let closing: Box<dyn TimingCondition> = match (config.max_rounds, config.max_days) {
        (None, None) => Box::new(NeverClearingCondition),
        (max_rounds, max_days) => {
            let mut any = CombiTimingCondition::new(CombiOp::Or);
            if let Some(rounds) = max_rounds {
                any.push(Box::new(MaxRoundsAuctionClosingCondition::new(rounds)));
            }
            if let Some(days) = max_days {
                any.push(Box::new(MaxDaysAuctionClosingCondition::new(days)));
            }
            Box::new(any)
        },
    };

    Ok(Auctioneer::new(config.name, book, pricing, acceptance, event_handler)
        .with_clearing_condition(clearing)
        .with_day_ending_condition(day_ending)
        .with_closing_condition(closing))
}

/// Four-heap book with the configured priority, tick-rounded when requested
fn create_order_book(comparator: ComparatorType, tick_decimals: Option<u8>) -> Box<dyn OrderBook> {
    let book = FourHeapOrderBook::with_comparator(comparator_for(comparator));
    match tick_decimals {
        Some(decimals) => Box::new(TickOrderBook::new(book, decimals)),
        None => Box::new(book),
    }
}

fn create_pricing_policy(pricing: &PricingPolicyType) -> Result<Box<dyn PricingPolicy>, String> {
    match pricing {
        PricingPolicyType::Discriminatory { k } => DiscriminatoryPricingPolicy::new(*k)
            .map(|p| Box::new(p) as Box<dyn PricingPolicy>)
            .map_err(|e| e.to_string()),

        PricingPolicyType::Uniform { k } => UniformPricingPolicy::new(*k)
            .map(|p| Box::new(p) as Box<dyn PricingPolicy>)
            .map_err(|e| e.to_string()),

        PricingPolicyType::NPeriod { n } => NPricingPolicy::new(*n)
            .map(|p| Box::new(p) as Box<dyn PricingPolicy>)
            .map_err(|e| e.to_string()),
    }
}

fn create_acceptance_policy(
    acceptance: &AcceptancePolicyType,
    rng: StdRng,
) -> Result<Box<dyn AcceptancePolicy>, String> {
    match acceptance {
        AcceptancePolicyType::AlwaysAccept => Ok(Box::new(AlwaysAcceptPolicy)),

        AcceptancePolicyType::QuoteBeating => Ok(Box::new(QuoteBeatingPolicy)),

        AcceptancePolicyType::ShoutTypeBased { q } => ShoutTypeBasedPolicy::new(*q, rng)
            .map(|p| Box::new(p) as Box<dyn AcceptancePolicy>)
            .map_err(|e| e.to_string()),
    }
}

fn create_clearing_condition(
    clearing: &ClearingConditionType,
    rng: StdRng,
) -> Result<Box<dyn TimingCondition>, String> {
    match clearing {
        ClearingConditionType::EveryOrder => Ok(Box::new(OrderPlacedClearingCondition)),

        ClearingConditionType::EveryNRounds { n } => Ok(Box::new(RoundClearingCondition::new(*n))),

        ClearingConditionType::Probabilistic { threshold } => {
            ProbabilisticClearingCondition::new(*threshold, rng)
                .map(|c| Box::new(c) as Box<dyn TimingCondition>)
                .map_err(|e| e.to_string())
        },

        ClearingConditionType::Never => Ok(Box::new(NeverClearingCondition)),
    }
}

fn rng_for(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating auctioneers with fluent API
///
/// # Example
/// ```
/// use double_auction::prelude::*;
/// use double_auction::engine::factory::AuctioneerBuilder;
/// use std::sync::Arc;
/// use rust_decimal::Decimal;
///
/// let auctioneer = AuctioneerBuilder::new("widgets")
///     .clear_every_n_rounds(5)
///     .uniform_pricing(Decimal::new(5, 1))
///     .always_accept()
///     .with_tick_decimals(2)
///     .build(Arc::new(NoOpEventHandler))
///     .unwrap();
/// ```
pub struct AuctioneerBuilder {
    config: MarketConfig,
}

impl AuctioneerBuilder {
    /// Create a new builder for a continuous double auction
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: MarketConfig::continuous_double_auction(name.into()),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: MarketConfig) -> Self {
        Self { config }
    }

    // ========================================================================
    // Clearing Configuration
    // ========================================================================

    /// Clear after every accepted order
    pub fn clear_every_order(mut self) -> Self {
        self.config.clearing = ClearingConditionType::EveryOrder;
        self
    }

    /// Clear at the end of every `n`-th round
    pub fn clear_every_n_rounds(mut self, n: u64) -> Self {
        self.config.clearing = ClearingConditionType::EveryNRounds { n };
        self
    }

    /// Clear after an accepted order with probability `threshold`
    pub fn clear_probabilistically(mut self, threshold: f64) -> Self {
        self.config.clearing = ClearingConditionType::Probabilistic { threshold };
        self
    }

    /// Only clear on explicit request
    pub fn clear_on_request(mut self) -> Self {
        self.config.clearing = ClearingConditionType::Never;
        self
    }

    // ========================================================================
    // Pricing Configuration
    // ========================================================================

    pub fn discriminatory_pricing(mut self, k: Decimal) -> Self {
        self.config.pricing = PricingPolicyType::Discriminatory { k };
        self
    }

    pub fn uniform_pricing(mut self, k: Decimal) -> Self {
        self.config.pricing = PricingPolicyType::Uniform { k };
        self
    }

    pub fn n_period_pricing(mut self, n: usize) -> Self {
        self.config.pricing = PricingPolicyType::NPeriod { n };
        self
    }

    // ========================================================================
    // Acceptance Configuration
    // ========================================================================

    pub fn always_accept(mut self) -> Self {
        self.config.acceptance = AcceptancePolicyType::AlwaysAccept;
        self
    }

    pub fn quote_beating(mut self) -> Self {
        self.config.acceptance = AcceptancePolicyType::QuoteBeating;
        self
    }

    pub fn shout_type_based(mut self, q: f64) -> Self {
        self.config.acceptance = AcceptancePolicyType::ShoutTypeBased { q };
        self
    }

    // ========================================================================
    // Additional Configuration
    // ========================================================================

    /// Set the heap ordering
    pub fn with_comparator(mut self, comparator: ComparatorType) -> Self {
        self.config.comparator = comparator;
        self
    }

    /// Round prices to a number of decimals
    pub fn with_tick_decimals(mut self, decimals: u8) -> Self {
        self.config.tick_decimals = Some(decimals);
        self
    }

    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.config.max_rounds = Some(rounds);
        self
    }

    pub fn with_max_days(mut self, days: u64) -> Self {
        self.config.max_days = Some(days);
        self
    }

    pub fn with_rounds_per_day(mut self, rounds: u64) -> Self {
        self.config.rounds_per_day = Some(rounds);
        self
    }

    /// Seed randomised policies for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    // ========================================================================
    // Preset Configurations
    // ========================================================================

    pub fn continuous_double_auction(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    pub fn call_market(name: impl Into<String>) -> Self {
        Self {
            config: MarketConfig::call_market(name.into()),
        }
    }

    pub fn clearing_house(name: impl Into<String>, rounds: u64) -> Self {
        Self {
            config: MarketConfig::clearing_house(name.into(), rounds),
        }
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the auctioneer
    pub fn build(self, event_handler: Arc<dyn EventHandler>) -> Result<Auctioneer, String> {
        create_from_config(self.config, event_handler)
    }

    /// Get the configuration without building (for inspection)
    pub fn get_config(&self) -> &MarketConfig {
        &self.config
    }
}

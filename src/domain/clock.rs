// ============================================================================
// Auction Clock
// Round and day counters read by timing conditions
// ============================================================================

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logical time of an auction. All counters start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuctionClock {
    /// Rounds closed since the auction started
    pub round: u64,
    /// Days closed since the auction started
    pub day: u64,
    /// Rounds closed since the current day started
    pub round_in_day: u64,
}

impl AuctionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_round(&mut self) {
        self.round += 1;
        self.round_in_day += 1;
    }

    pub fn end_day(&mut self) {
        self.day += 1;
        self.round_in_day = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_counters() {
        let mut clock = AuctionClock::new();
        clock.advance_round();
        clock.advance_round();
        assert_eq!(clock.round, 2);
        assert_eq!(clock.round_in_day, 2);

        clock.end_day();
        clock.advance_round();
        assert_eq!(clock.day, 1);
        assert_eq!(clock.round, 3);
        assert_eq!(clock.round_in_day, 1);

        clock.reset();
        assert_eq!(clock, AuctionClock::default());
    }
}

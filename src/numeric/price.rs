// ============================================================================
// Fixed-Point Price
// Exact decimal prices with a per-value exponent (tick precision)
// ============================================================================

use super::errors::{NumericError, NumericResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Exponent used when a constructor is not told otherwise (four decimals).
pub const DEFAULT_EXPONENT: u8 = 4;

/// Largest exponent a price may carry; `10^18` still fits in an i64.
pub const MAX_EXPONENT: u8 = 18;

/// Compute 10^n at compile time
const fn pow10(n: u8) -> i64 {
    let mut result: i64 = 1;
    let mut i = 0;
    while i < n {
        result *= 10;
        i += 1;
    }
    result
}

/// Fixed-point decimal price.
///
/// A price is stored as a whole part plus a non-negative fractional
/// remainder in units of `10^-exponent`, so `-1.25` at exponent 2 is
/// `whole = -2, fractional = 75`. Comparisons are exact and never go
/// through floating point; prices with different exponents compare by
/// value (`1.5 == 1.50`).
///
/// # Example
/// ```
/// use double_auction::numeric::Price;
///
/// let p = Price::from_f64(12.34).unwrap();
/// assert_eq!(p.long_value(), 123_400);
/// assert_eq!(p.to_pretty_string(), "+12.3400");
/// ```
#[derive(Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price {
    whole: i64,
    fractional: i64,
    exponent: u8,
    multiplier: i64,
}

impl Price {
    /// Zero at the default exponent.
    pub const ZERO: Self = Self {
        whole: 0,
        fractional: 0,
        exponent: DEFAULT_EXPONENT,
        multiplier: pow10(DEFAULT_EXPONENT),
    };

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create from an already scaled value (`value × 10^exponent`).
    pub fn from_raw(long_value: i64, exponent: u8) -> NumericResult<Self> {
        if exponent > MAX_EXPONENT {
            return Err(NumericError::InvalidInput);
        }
        let multiplier = pow10(exponent);
        Ok(Self {
            whole: long_value.div_euclid(multiplier),
            fractional: long_value.rem_euclid(multiplier),
            exponent,
            multiplier,
        })
    }

    /// Create a whole-number price at the default exponent.
    ///
    /// # Errors
    /// Returns `Overflow` if the scaled value does not fit in an i64.
    pub fn from_whole(whole: i64) -> NumericResult<Self> {
        Self::from_whole_fractional(whole, 0, DEFAULT_EXPONENT)
    }

    /// Create from a whole part and a fractional remainder in `10^-exponent` units.
    ///
    /// `fractional` must lie in `[0, 10^exponent)`.
    pub fn from_whole_fractional(whole: i64, fractional: i64, exponent: u8) -> NumericResult<Self> {
        if exponent > MAX_EXPONENT {
            return Err(NumericError::InvalidInput);
        }
        let multiplier = pow10(exponent);
        if !(0..multiplier).contains(&fractional) {
            return Err(NumericError::InvalidInput);
        }
        whole
            .checked_mul(multiplier)
            .and_then(|scaled| scaled.checked_add(fractional))
            .ok_or(NumericError::Overflow)?;

        Ok(Self {
            whole,
            fractional,
            exponent,
            multiplier,
        })
    }

    /// Create from a floating point value at the default exponent.
    ///
    /// # Errors
    /// Returns `NonFinite` for NaN or infinite input.
    pub fn from_f64(value: f64) -> NumericResult<Self> {
        Self::from_f64_with_exponent(value, DEFAULT_EXPONENT)
    }

    /// Create from a floating point value, rounding half away from zero at `exponent`.
    pub fn from_f64_with_exponent(value: f64, exponent: u8) -> NumericResult<Self> {
        if !value.is_finite() {
            return Err(NumericError::NonFinite);
        }
        let decimal = Decimal::from_f64(value).ok_or(NumericError::Overflow)?;
        Self::from_decimal(decimal, exponent)
    }

    /// Convert from `rust_decimal::Decimal`, rounding half away from zero at `exponent`.
    pub fn from_decimal(value: Decimal, exponent: u8) -> NumericResult<Self> {
        if exponent > MAX_EXPONENT {
            return Err(NumericError::InvalidInput);
        }
        let scaled = value
            .checked_mul(Decimal::from(pow10(exponent)))
            .ok_or(NumericError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let raw = scaled.to_i64().ok_or(NumericError::Overflow)?;
        Self::from_raw(raw, exponent)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The value scaled by `10^exponent`.
    #[inline]
    pub fn long_value(&self) -> i64 {
        // Fits by construction; the i128 detour avoids an intermediate
        // overflow of `whole * multiplier` near i64::MIN.
        (self.whole as i128 * self.multiplier as i128 + self.fractional as i128) as i64
    }

    #[inline]
    pub fn whole(&self) -> i64 {
        self.whole
    }

    #[inline]
    pub fn fractional(&self) -> i64 {
        self.fractional
    }

    #[inline]
    pub fn exponent(&self) -> u8 {
        self.exponent
    }

    #[inline]
    pub fn multiplier(&self) -> i64 {
        self.multiplier
    }

    /// Floating point view of the price. Display only; never compare with it.
    pub fn to_f64(&self) -> f64 {
        self.long_value() as f64 / self.multiplier as f64
    }

    /// Exact decimal view of the price.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.long_value(), self.exponent as u32)
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.whole < 0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.whole > 0 || (self.whole == 0 && self.fractional > 0)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.whole == 0 && self.fractional == 0
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Checked addition; the result carries the larger of the two exponents.
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        let exponent = self.exponent.max(rhs.exponent);
        let sum = self.scaled_to(exponent) + rhs.scaled_to(exponent);
        Self::from_i128(sum, exponent)
    }

    /// Checked subtraction; the result carries the larger of the two exponents.
    pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
        let exponent = self.exponent.max(rhs.exponent);
        let diff = self.scaled_to(exponent) - rhs.scaled_to(exponent);
        Self::from_i128(diff, exponent)
    }

    /// Multiply by a whole number (e.g. a quantity).
    pub fn checked_mul_int(self, rhs: i64) -> NumericResult<Self> {
        let raw = self
            .long_value()
            .checked_mul(rhs)
            .ok_or(NumericError::Overflow)?;
        Self::from_raw(raw, self.exponent)
    }

    /// Round to `decimals` places, half away from zero, keeping the exponent.
    ///
    /// A no-op when `decimals >= exponent`.
    pub fn round_to_decimals(self, decimals: u8) -> NumericResult<Self> {
        if decimals >= self.exponent {
            return Ok(self);
        }
        let factor = pow10(self.exponent - decimals) as i128;
        let half = factor / 2;
        let value = self.long_value() as i128;
        let quotient = if value >= 0 {
            (value + half) / factor
        } else {
            (value - half) / factor
        };
        Self::from_i128(quotient * factor, self.exponent)
    }

    /// Sign-prefixed fixed-width rendering, e.g. `+12.3400`.
    pub fn to_pretty_string(&self) -> String {
        let sign = if self.is_negative() { '-' } else { '+' };
        format!("{}{}", sign, self.unsigned_string())
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn scaled_to(&self, exponent: u8) -> i128 {
        debug_assert!(exponent >= self.exponent);
        self.long_value() as i128 * pow10(exponent - self.exponent) as i128
    }

    fn from_i128(raw: i128, exponent: u8) -> NumericResult<Self> {
        let raw = i64::try_from(raw).map_err(|_| NumericError::Overflow)?;
        Self::from_raw(raw, exponent)
    }

    fn unsigned_string(&self) -> String {
        let magnitude = self.long_value().unsigned_abs();
        let multiplier = self.multiplier as u64;
        if self.exponent == 0 {
            magnitude.to_string()
        } else {
            format!(
                "{}.{:0>width$}",
                magnitude / multiplier,
                magnitude % multiplier,
                width = self.exponent as usize
            )
        }
    }

    /// Value with trailing zero digits removed, used for exponent-independent hashing.
    fn canonical(&self) -> (i64, u8) {
        let mut value = self.long_value();
        let mut exponent = self.exponent;
        while exponent > 0 && value % 10 == 0 {
            value /= 10;
            exponent -= 1;
        }
        (value, exponent)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.exponent == other.exponent {
            return self.long_value().cmp(&other.long_value());
        }
        let exponent = self.exponent.max(other.exponent);
        self.scaled_to(exponent).cmp(&other.scaled_to(exponent))
    }
}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({}, exp={})", self, self.exponent)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.unsigned_string())
        } else {
            write!(f, "{}", self.unsigned_string())
        }
    }
}

impl FromStr for Price {
    type Err = NumericError;

    /// Parse a decimal string. Uses the default exponent unless the input
    /// carries more decimals, in which case the exponent grows to fit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| NumericError::InvalidInput)?;
        let scale = decimal.scale();
        if scale > MAX_EXPONENT as u32 {
            return Err(NumericError::PrecisionLoss);
        }
        Self::from_decimal(decimal, DEFAULT_EXPONENT.max(scale as u8))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(price: &Price) -> u64 {
        let mut hasher = DefaultHasher::new();
        price.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_from_whole() {
        let p = Price::from_whole(12).unwrap();
        assert_eq!(p.long_value(), 120_000);
        assert_eq!(p.whole(), 12);
        assert_eq!(p.fractional(), 0);
        assert_eq!(p.multiplier(), 10_000);
    }

    #[test]
    fn test_from_whole_fractional() {
        let p = Price::from_whole_fractional(3, 25, 2).unwrap();
        assert_eq!(p.long_value(), 325);
        assert_eq!(p.to_string(), "3.25");

        assert_eq!(
            Price::from_whole_fractional(3, 100, 2),
            Err(NumericError::InvalidInput)
        );
        assert_eq!(
            Price::from_whole_fractional(3, -1, 2),
            Err(NumericError::InvalidInput)
        );
        assert_eq!(
            Price::from_whole_fractional(1, 0, 19),
            Err(NumericError::InvalidInput)
        );
    }

    #[test]
    fn test_negative_decomposition() {
        let p = Price::from_f64_with_exponent(-1.25, 2).unwrap();
        assert_eq!(p.whole(), -2);
        assert_eq!(p.fractional(), 75);
        assert_eq!(p.long_value(), -125);
        assert!(p.is_negative());
        assert!(!p.is_positive());
        assert_eq!(p.to_string(), "-1.25");
    }

    #[test]
    fn test_from_f64_rounds() {
        let p = Price::from_f64(12.34).unwrap();
        assert_eq!(p.long_value(), 123_400);

        let q = Price::from_f64(0.123456).unwrap();
        assert_eq!(q.long_value(), 1235);

        let r = Price::from_f64_with_exponent(2.5, 0).unwrap();
        assert_eq!(r.long_value(), 3);
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert_eq!(Price::from_f64(f64::NAN), Err(NumericError::NonFinite));
        assert_eq!(Price::from_f64(f64::INFINITY), Err(NumericError::NonFinite));
        assert_eq!(
            Price::from_f64(f64::NEG_INFINITY),
            Err(NumericError::NonFinite)
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(Price::from_whole(i64::MAX), Err(NumericError::Overflow));
        assert_eq!(Price::from_f64(1e30), Err(NumericError::Overflow));
    }

    #[test]
    fn test_ordering_across_exponents() {
        let a = Price::from_whole_fractional(1, 5, 1).unwrap();
        let b = Price::from_whole_fractional(1, 50, 2).unwrap();
        let c = Price::from_whole_fractional(1, 51, 2).unwrap();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert!(c > a);
        assert!(Price::from_whole(-1).unwrap() < Price::ZERO);
    }

    #[test]
    fn test_pretty_string() {
        assert_eq!(Price::from_f64(12.34).unwrap().to_pretty_string(), "+12.3400");
        assert_eq!(Price::from_f64(-0.5).unwrap().to_pretty_string(), "-0.5000");
        assert_eq!(Price::ZERO.to_pretty_string(), "+0.0000");
        assert_eq!(Price::from_raw(42, 0).unwrap().to_pretty_string(), "+42");
    }

    #[test]
    fn test_round_to_decimals() {
        let p = Price::from_f64_with_exponent(0.123456, 6).unwrap();
        let rounded = p.round_to_decimals(4).unwrap();
        assert_eq!(rounded.long_value(), 123_500);
        assert_eq!(rounded.exponent(), 6);
        assert_eq!(rounded, Price::from_f64(0.1235).unwrap());

        let neg = Price::from_f64_with_exponent(-0.125, 3).unwrap();
        assert_eq!(neg.round_to_decimals(2).unwrap().long_value(), -130);

        assert_eq!(p.round_to_decimals(8).unwrap(), p);
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Price::from_whole_fractional(1, 5, 1).unwrap();
        let b = Price::from_whole_fractional(0, 25, 2).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.exponent(), 2);
        assert_eq!(sum.long_value(), 175);
        assert_eq!(a.checked_sub(b).unwrap().long_value(), 125);
        assert_eq!(a.checked_mul_int(4).unwrap().long_value(), 60);

        let max = Price::from_raw(i64::MAX, 0).unwrap();
        assert_eq!(max.checked_add(max), Err(NumericError::Overflow));
    }

    #[test]
    fn test_decimal_round_trip() {
        let p: Price = "10.125".parse().unwrap();
        assert_eq!(p.exponent(), 4);
        assert_eq!(p.to_decimal(), Decimal::new(101_250, 4));

        let fine: Price = "0.123456".parse().unwrap();
        assert_eq!(fine.exponent(), 6);

        assert_eq!("abc".parse::<Price>(), Err(NumericError::InvalidInput));
    }

    #[test]
    fn test_extreme_raw_values() {
        let p = Price::from_raw(i64::MIN, 1).unwrap();
        assert_eq!(p.long_value(), i64::MIN);
        assert!(p.fractional() >= 0);
    }
}

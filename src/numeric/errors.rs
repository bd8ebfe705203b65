// ============================================================================
// Numeric Errors
// Error types for fixed-point price construction and arithmetic
// ============================================================================

use std::fmt;

/// Errors that can occur while building or combining prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumericError {
    /// Result does not fit in an i64 at the requested exponent
    Overflow,
    /// Input floating point value was NaN or infinite
    NonFinite,
    /// Input string, fraction or exponent is invalid
    InvalidInput,
    /// Conversion would lose significant digits
    PrecisionLoss,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::Overflow => {
                write!(f, "arithmetic overflow: value does not fit the price range")
            },
            NumericError::NonFinite => write!(f, "invalid price: value is NaN or infinite"),
            NumericError::InvalidInput => write!(f, "invalid input: could not parse value"),
            NumericError::PrecisionLoss => write!(
                f,
                "precision loss: conversion would lose significant digits"
            ),
        }
    }
}

impl std::error::Error for NumericError {}

/// Result type alias for numeric operations
pub type NumericResult<T> = Result<T, NumericError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NumericError::NonFinite.to_string(),
            "invalid price: value is NaN or infinite"
        );
        assert_eq!(
            NumericError::Overflow.to_string(),
            "arithmetic overflow: value does not fit the price range"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(NumericError::Overflow, NumericError::Overflow);
        assert_ne!(NumericError::Overflow, NumericError::NonFinite);
    }
}

// ============================================================================
// Numeric Module
// Fixed-point prices and integer quantities for exact matching
// ============================================================================
//
// This module provides:
// - Price: fixed-point decimal with a per-value exponent
// - NumericError: Error types for price construction and arithmetic
// - Quantity: whole-unit order volume
//
// Design principles:
// - No floating-point comparisons anywhere in the book
// - All fallible construction returns Result (no panics)
// - Floating point only at the edges (from_f64 / to_f64)

mod errors;
mod price;

pub use errors::{NumericError, NumericResult};
pub use price::{Price, DEFAULT_EXPONENT, MAX_EXPONENT};

/// Order volume in whole units. Every live order fragment has a positive quantity.
pub type Quantity = u32;

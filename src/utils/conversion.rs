//! Numeric conversion utilities.
//!
//! Upstream APIs report token reserve amounts as fixed-point-scaled integers
//! (often as strings, since they exceed what a JSON number can carry).
//! These helpers convert such values to decimal `f64` by dividing by
//! `10^decimals`, using BigDecimal to avoid precision loss for values
//! larger than 2^53.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use std::str::FromStr;

/// Parse a string representation of a scaled integer amount to f64,
/// dividing by `10^decimals`.
///
/// # Arguments
/// * `value_str` - The string representation of the raw amount
/// * `decimals` - The number of decimal places to adjust by
///
/// # Returns
/// * `Some(f64)` if parsing succeeds and the result is finite and
///   non-negative, `None` otherwise
pub fn str_to_f64_with_decimals(value_str: &str, decimals: u8) -> Option<f64> {
    let big_value = BigDecimal::from_str(value_str.trim()).ok()?;

    let adjusted = big_value / big_pow10(decimals);

    let result = adjusted.to_f64()?;

    if result.is_finite() && result >= 0.0 {
        Some(result)
    } else {
        None
    }
}

/// Clamp a float to 0.0 unless it is finite.
///
/// Upstream metric fields occasionally arrive as strings that parse to
/// infinity or NaN; those must never reach storage.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_amount_descaled() {
        // 1.5 tokens with 18 decimals
        let raw = "1500000000000000000";
        assert_eq!(str_to_f64_with_decimals(raw, 18), Some(1.5));
    }

    #[test]
    fn test_str_amount_larger_than_f64_mantissa() {
        // 123456789.123456789 with 18 decimals; the raw integer exceeds 2^53
        let raw = "123456789123456789000000000";
        let value = str_to_f64_with_decimals(raw, 18).unwrap();
        assert!((value - 123_456_789.123_456_789).abs() < 1e-6);
    }

    #[test]
    fn test_str_amount_rejects_garbage() {
        assert_eq!(str_to_f64_with_decimals("not-a-number", 18), None);
        assert_eq!(str_to_f64_with_decimals("-5", 18), None);
    }

    #[test]
    fn test_zero_decimals_is_identity() {
        assert_eq!(str_to_f64_with_decimals("42", 0), Some(42.0));
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(1.25), 1.25);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
    }
}

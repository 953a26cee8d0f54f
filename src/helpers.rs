//! Decimal rounding for cache keys.
//!
//! Cache keys are built from rounded parameters so that near-duplicate
//! requests (e.g. 51.5012 vs 51.4987) hit the same entry. Rounding goes
//! through `Decimal` so the textual key is stable and free of binary
//! floating-point artefacts such as `51.50000000000001`.
//!
//! Non-finite inputs map to `Decimal::ZERO`; they never reach these helpers
//! after validation, so a warning is logged when they do.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert an f64 to Decimal, rounded half away from zero to `dp` decimal places.
pub(crate) fn f64_to_decimal_dp(v: f64, dp: u32) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_f64(v)
        .unwrap_or_default()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_f64_to_decimal_dp_rounds() {
        assert_eq!(f64_to_decimal_dp(51.5049, 2), Decimal::from_str("51.5").unwrap());
        assert_eq!(f64_to_decimal_dp(51.5061, 2), Decimal::from_str("51.51").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_dp_negative() {
        assert_eq!(f64_to_decimal_dp(-0.1249, 2), Decimal::from_str("-0.12").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_dp_normalizes_trailing_zeros() {
        assert_eq!(f64_to_decimal_dp(35.0, 0).to_string(), "35");
        assert_eq!(f64_to_decimal_dp(1000.0, 1).to_string(), "1000");
    }

    #[test]
    fn test_f64_to_decimal_dp_nan() {
        assert_eq!(f64_to_decimal_dp(f64::NAN, 2), Decimal::ZERO);
        assert_eq!(f64_to_decimal_dp(f64::INFINITY, 2), Decimal::ZERO);
    }
}

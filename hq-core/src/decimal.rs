//! Domain helpers layered on [`rust_decimal::Decimal`].
//!
//! The engine never reimplements fixed-point arithmetic: `rust_decimal::Decimal` already
//! provides exact add/sub/mul/div, comparison, signed zero/negation/absolute value, and
//! string parse/format. This module only adds the handful of domain-specific conversions
//! the rest of the workspace shares.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Ten thousand, used to convert a proportion into basis points.
pub const BPS_SCALE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// `(a - b) / b * 10_000`, the basis-point deviation of `a` from reference `b`.
///
/// Returns `Decimal::ZERO` if `b` is zero (no reference to measure a deviation against).
pub fn bps_diff(a: Decimal, b: Decimal) -> Decimal {
    if b.is_zero() {
        return Decimal::ZERO;
    }
    ((a - b) / b) * BPS_SCALE
}

/// Lossy conversion to `f64`, intended for display/logging only. Never used for accounting.
pub fn to_f64_lossy(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// `true` if `value` is strictly greater than zero.
pub fn is_strictly_positive(value: Decimal) -> bool {
    value > Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bps_diff_is_exact_for_round_numbers() {
        // (101 - 100) / 100 * 10_000 = 100 bps
        assert_eq!(bps_diff(dec!(101), dec!(100)), dec!(100));
    }

    #[test]
    fn bps_diff_zero_reference_is_zero() {
        assert_eq!(bps_diff(dec!(5), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn add_then_sub_round_trips_exactly() {
        // Decimal(a) + Decimal(b) - Decimal(b) = Decimal(a), no float drift.
        let a = dec!(0.1);
        let b = dec!(0.2);
        assert_eq!(a + b - b, a);
    }
}

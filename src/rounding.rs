//! Precision rounding primitives.
//!
//! Two presentation formats mutate the number they apply to: `decimals N`
//! and `N sig figs`. Both round half-away-from-zero, which is what
//! `f64::round` does for the scaled value.

use num_traits::Float;

/// Rounds `value` to `count` decimal places, half-away-from-zero.
pub(crate) fn round_decimals<F: Float>(value: F, count: u8) -> F {
    let scale = pow10::<F>(i32::from(count));
    (value * scale).round() / scale
}

/// Rounds `value` to `count` significant figures.
///
/// The rounding scale is `10^(⌊log₁₀|x|⌋ − count + 1)`; zero passes
/// through unchanged because it has no leading digit.
pub(crate) fn round_sig_figs<F: Float>(value: F, count: u8) -> F {
    if value.is_zero() || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor();
    let exponent = magnitude.to_i32().unwrap_or(0) - i32::from(count) + 1;
    let scale = pow10::<F>(exponent);
    (value / scale).round() * scale
}

#[inline]
fn pow10<F: Float>(exponent: i32) -> F {
    F::from(10.0).unwrap_or_else(F::one).powi(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_round_half_away_from_zero() {
        assert_eq!(round_decimals(2.5f64, 0), 3.0);
        assert_eq!(round_decimals(-2.5f64, 0), -3.0);
        assert_eq!(round_decimals(1.005f64, 1), 1.0);
        assert_eq!(round_decimals(3.14159f64, 2), 3.14);
    }

    #[test]
    fn sig_figs_scale_by_leading_digit() {
        assert_eq!(round_sig_figs(1234.5f64, 2), 1200.0);
        assert_eq!(round_sig_figs(0.0012345f64, 3), 0.00123);
        assert_eq!(round_sig_figs(-987.0f64, 1), -1000.0);
        assert_eq!(round_sig_figs(0.0f64, 4), 0.0);
    }
}

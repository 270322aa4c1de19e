//! Integer cent arithmetic.
//!
//! All monetary math in the engine is done in integer minor currency
//! units. Pro-rata divisions round half to even so that aggregate drift
//! across a distribution batch stays bounded.

use std::cmp::Ordering;

/// A signed amount in minor currency units (cents).
pub type Cents = i64;

/// Compute `amount * numer / denom` rounding half to even.
///
/// Intermediates are widened to `u128`, so the multiplication cannot
/// overflow. Returns `None` if `denom` is zero or the rounded result does
/// not fit in `u64`.
pub fn mul_div_round_half_even(amount: u64, numer: u64, denom: u64) -> Option<u64> {
    if denom == 0 {
        return None;
    }
    let n = amount as u128 * numer as u128;
    let d = denom as u128;
    let q = n / d;
    let r = n % d;
    let rounded = match (2 * r).cmp(&d) {
        Ordering::Less => q,
        Ordering::Greater => q + 1,
        Ordering::Equal => {
            if q % 2 == 0 {
                q
            } else {
                q + 1
            }
        }
    };
    u64::try_from(rounded).ok()
}

/// Apply a basis-point rate to an amount, rounding half to even.
///
/// 10_000 bps = 100%. Returns `None` only on overflow of the result.
pub fn apply_bps(amount: u64, bps: u64) -> Option<u64> {
    mul_div_round_half_even(amount, bps, crate::BPS_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_division() {
        assert_eq!(mul_div_round_half_even(70_000, 80, 100), Some(56_000));
    }

    #[test]
    fn test_round_down() {
        // 10 * 1 / 3 = 3.33.. -> 3
        assert_eq!(mul_div_round_half_even(10, 1, 3), Some(3));
    }

    #[test]
    fn test_round_up() {
        // 20 * 1 / 3 = 6.66.. -> 7
        assert_eq!(mul_div_round_half_even(20, 1, 3), Some(7));
    }

    #[test]
    fn test_half_rounds_to_even() {
        // 1 * 1 / 2 = 0.5 -> 0 (even)
        assert_eq!(mul_div_round_half_even(1, 1, 2), Some(0));
        // 3 * 1 / 2 = 1.5 -> 2 (even)
        assert_eq!(mul_div_round_half_even(3, 1, 2), Some(2));
        // 5 * 1 / 2 = 2.5 -> 2 (even)
        assert_eq!(mul_div_round_half_even(5, 1, 2), Some(2));
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(mul_div_round_half_even(100, 1, 0), None);
    }

    #[test]
    fn test_large_amounts_no_overflow() {
        let amount = u64::MAX / 2;
        assert_eq!(mul_div_round_half_even(amount, 1, 1), Some(amount));
    }

    #[test]
    fn test_result_overflow() {
        assert_eq!(mul_div_round_half_even(u64::MAX, 2, 1), None);
    }

    #[test]
    fn test_apply_bps() {
        // 24% of 100_000
        assert_eq!(apply_bps(100_000, 2_400), Some(24_000));
        // 2.0x multiplier
        assert_eq!(apply_bps(56_000, 20_000), Some(112_000));
        // 100% identity
        assert_eq!(apply_bps(12_345, 10_000), Some(12_345));
    }

    #[test]
    fn test_apply_fractional_bps() {
        // 20.42% of 10_000 = 2042
        assert_eq!(apply_bps(10_000, 2_042), Some(2_042));
        // 20.42% of 6_000 = 1225.2 -> 1225
        assert_eq!(apply_bps(6_000, 2_042), Some(1_225));
    }
}

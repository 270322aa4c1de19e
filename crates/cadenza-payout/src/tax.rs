//! Tax withholding table.
//!
//! An illustrative rate/threshold table, not a jurisdiction engine. Each
//! country carries a reporting threshold and a flat rate in basis points;
//! gross amounts below the threshold are paid without withholding.
//! The table matches [`Country`] exhaustively, so a new country is a
//! compile-time-checked addition.

use serde::{Deserialize, Serialize};

use cadenza_types::country::Country;
use cadenza_types::money::apply_bps;

/// Withholding parameters for one country.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingRule {
    /// Flat withholding rate in basis points (10_000 = 100%).
    pub rate_bps: u64,
    /// Gross amounts below this are not withheld against.
    pub reporting_threshold_cents: u64,
}

/// Gross/tax/net breakdown of a payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withholding {
    pub gross_cents: u64,
    pub tax_cents: u64,
    pub net_cents: u64,
}

/// The withholding rule for a country.
pub fn rule_for(country: Country) -> WithholdingRule {
    match country {
        Country::UnitedStates => WithholdingRule {
            rate_bps: 2_400,
            reporting_threshold_cents: 60_000,
        },
        Country::UnitedKingdom => WithholdingRule {
            rate_bps: 2_000,
            reporting_threshold_cents: 100_000,
        },
        Country::Germany => WithholdingRule {
            rate_bps: 2_500,
            reporting_threshold_cents: 80_000,
        },
        Country::Japan => WithholdingRule {
            rate_bps: 2_042,
            reporting_threshold_cents: 50_000,
        },
        Country::Brazil => WithholdingRule {
            rate_bps: 1_500,
            reporting_threshold_cents: 60_000,
        },
        // No treaty data: withhold conservatively from the first cent.
        Country::Other => WithholdingRule {
            rate_bps: 3_000,
            reporting_threshold_cents: 0,
        },
    }
}

/// Compute withholding for a gross amount.
///
/// Below the country's reporting threshold the tax is zero; otherwise
/// `tax = round(gross * rate)` with round-half-to-even, `net = gross -
/// tax`. The rate never exceeds 100%, so the math cannot overflow or go
/// negative.
pub fn compute(country: Country, gross_cents: u64) -> Withholding {
    let rule = rule_for(country);
    let tax_cents = if gross_cents < rule.reporting_threshold_cents {
        0
    } else {
        apply_bps(gross_cents, rule.rate_bps).unwrap_or(0)
    };
    Withholding {
        gross_cents,
        tax_cents,
        net_cents: gross_cents - tax_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_no_withholding() {
        // $60 gross, US threshold $600
        let w = compute(Country::UnitedStates, 6_000);
        assert_eq!(w.tax_cents, 0);
        assert_eq!(w.net_cents, 6_000);
    }

    #[test]
    fn test_at_threshold_withholds() {
        let w = compute(Country::UnitedStates, 60_000);
        assert_eq!(w.tax_cents, 14_400); // 24%
        assert_eq!(w.net_cents, 45_600);
    }

    #[test]
    fn test_gross_always_splits_exactly() {
        for country in [
            Country::UnitedStates,
            Country::UnitedKingdom,
            Country::Germany,
            Country::Japan,
            Country::Brazil,
            Country::Other,
        ] {
            for gross in [0u64, 1, 59_999, 60_000, 123_457] {
                let w = compute(country, gross);
                assert_eq!(w.tax_cents + w.net_cents, w.gross_cents);
            }
        }
    }

    #[test]
    fn test_other_withholds_from_first_cent() {
        let w = compute(Country::Other, 1_000);
        assert_eq!(w.tax_cents, 300);
        assert_eq!(w.net_cents, 700);
    }

    #[test]
    fn test_fractional_rate_rounds_half_even() {
        // Japan 20.42% of 6_000 = 1225.2 -> 1225
        let w = compute(Country::Japan, 60_000);
        assert_eq!(w.tax_cents, 12_252);
    }
}

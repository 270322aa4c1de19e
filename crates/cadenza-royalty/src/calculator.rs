//! Pro-rata royalty calculation.
//!
//! All monetary math is in integer cents with round-half-to-even
//! (`cadenza_types::money`), so aggregate drift across a distribution
//! batch stays bounded.
//!
//! [`calculate`] is the per-creator contract: pool share, tier
//! multiplier, fraud discount. Because the multiplier is applied after
//! the pro-rata division, summing `calculate` outputs across creators
//! can exceed the pool. [`allocate`] is what actually feeds the ledger:
//! it folds each creator's multiplier into the weight before
//! normalizing, so the allocated total never exceeds the pool.

use serde::{Deserialize, Serialize};

use cadenza_types::money::mul_div_round_half_even;
use cadenza_types::CreatorId;

use crate::{Result, RoyaltyError};

/// Breakdown of one creator's royalty for a period.
///
/// Ephemeral: produced once per creator per distribution period and
/// immediately turned into a ledger transaction with this breakdown as
/// metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyCalculationResult {
    /// Pro-rata pool share before the tier multiplier.
    pub base_amount: u64,
    /// Tier multiplier in basis points (10_000 = 1.0x).
    pub tier_multiplier_bps: u64,
    /// Base amount with the tier multiplier applied.
    pub final_amount: u64,
    /// Fraud-flagged qualified streams in the period.
    pub fraud_stream_count: u64,
    /// Final amount discounted by the fraud ratio. This is what gets
    /// credited.
    pub adjusted_amount: u64,
    /// Adjusted amount per qualified stream, informational only.
    pub per_stream_rate: u64,
}

impl RoyaltyCalculationResult {
    fn zero(tier_multiplier_bps: u64, fraud_stream_count: u64) -> Self {
        Self {
            base_amount: 0,
            tier_multiplier_bps,
            final_amount: 0,
            fraud_stream_count,
            adjusted_amount: 0,
            per_stream_rate: 0,
        }
    }
}

/// One creator's input to a pool allocation.
#[derive(Clone, Debug)]
pub struct CreatorShare {
    pub creator_id: CreatorId,
    pub qualified_streams: u64,
    pub fraud_streams: u64,
    pub tier_multiplier_bps: u64,
}

/// A creator's allocated slice of a pool.
#[derive(Clone, Debug)]
pub struct Allocation {
    pub creator_id: CreatorId,
    pub result: RoyaltyCalculationResult,
}

fn validate_counts(qualified: u64, fraud: u64) -> Result<()> {
    if fraud > qualified {
        return Err(RoyaltyError::InvalidShare(format!(
            "fraud streams {fraud} exceed qualified streams {qualified}"
        )));
    }
    Ok(())
}

/// Discount an amount by the fraud ratio `fraud / qualified`.
fn fraud_adjust(amount: u64, qualified: u64, fraud: u64) -> Result<u64> {
    if qualified == 0 {
        return Ok(0);
    }
    mul_div_round_half_even(amount, qualified - fraud, qualified).ok_or(RoyaltyError::Overflow)
}

/// Per-creator royalty breakdown.
///
/// An empty platform period (`platform_qualified_streams == 0`) or a
/// creator with no qualified streams yields a zero result, not an error.
///
/// # Errors
///
/// - [`RoyaltyError::InvalidShare`] if counts are inconsistent
/// - [`RoyaltyError::Overflow`] on arithmetic overflow
pub fn calculate(
    pool_cents: u64,
    creator_qualified_streams: u64,
    platform_qualified_streams: u64,
    tier_multiplier_bps: u64,
    fraud_stream_count: u64,
) -> Result<RoyaltyCalculationResult> {
    validate_counts(creator_qualified_streams, fraud_stream_count)?;
    if creator_qualified_streams > platform_qualified_streams {
        return Err(RoyaltyError::InvalidShare(format!(
            "creator streams {creator_qualified_streams} exceed platform total {platform_qualified_streams}"
        )));
    }
    if platform_qualified_streams == 0 || creator_qualified_streams == 0 {
        return Ok(RoyaltyCalculationResult::zero(
            tier_multiplier_bps,
            fraud_stream_count,
        ));
    }

    let base_amount =
        mul_div_round_half_even(pool_cents, creator_qualified_streams, platform_qualified_streams)
            .ok_or(RoyaltyError::Overflow)?;
    let final_amount = mul_div_round_half_even(base_amount, tier_multiplier_bps, cadenza_types::BPS_SCALE)
        .ok_or(RoyaltyError::Overflow)?;
    let adjusted_amount =
        fraud_adjust(final_amount, creator_qualified_streams, fraud_stream_count)?;
    let per_stream_rate =
        mul_div_round_half_even(adjusted_amount, 1, creator_qualified_streams)
            .ok_or(RoyaltyError::Overflow)?;

    Ok(RoyaltyCalculationResult {
        base_amount,
        tier_multiplier_bps,
        final_amount,
        fraud_stream_count,
        adjusted_amount,
        per_stream_rate,
    })
}

/// Allocate a pool across creators, multiplier-weighted, capped at the
/// pool.
///
/// Each creator's weight is `qualified_streams * tier_multiplier_bps`;
/// the pool is divided over remaining weight sequentially, so the
/// pre-fraud amounts sum to the pool exactly and the fraud-discounted
/// credits can only sum to less. Creators with no qualified streams
/// receive a zero allocation.
///
/// # Errors
///
/// - [`RoyaltyError::InvalidShare`] if any share's counts are inconsistent
/// - [`RoyaltyError::Overflow`] on arithmetic overflow
pub fn allocate(pool_cents: u64, shares: &[CreatorShare]) -> Result<Vec<Allocation>> {
    let mut total_weight: u128 = 0;
    for share in shares {
        validate_counts(share.qualified_streams, share.fraud_streams)?;
        total_weight += share.qualified_streams as u128 * share.tier_multiplier_bps as u128;
    }

    let mut allocations = Vec::with_capacity(shares.len());
    let mut remaining_pool = pool_cents;
    let mut remaining_weight = total_weight;

    for share in shares {
        let weight = share.qualified_streams as u128 * share.tier_multiplier_bps as u128;
        if weight == 0 || remaining_weight == 0 {
            allocations.push(Allocation {
                creator_id: share.creator_id.clone(),
                result: RoyaltyCalculationResult::zero(
                    share.tier_multiplier_bps,
                    share.fraud_streams,
                ),
            });
            continue;
        }

        // Divide the remaining pool over the remaining weight; the last
        // weighted share absorbs the rounding residue.
        let weight_u64 = u64::try_from(weight).map_err(|_| RoyaltyError::Overflow)?;
        let remaining_weight_u64 =
            u64::try_from(remaining_weight).map_err(|_| RoyaltyError::Overflow)?;
        let amount = mul_div_round_half_even(remaining_pool, weight_u64, remaining_weight_u64)
            .ok_or(RoyaltyError::Overflow)?;
        remaining_pool -= amount;
        remaining_weight -= weight;

        let adjusted_amount =
            fraud_adjust(amount, share.qualified_streams, share.fraud_streams)?;
        let per_stream_rate =
            mul_div_round_half_even(adjusted_amount, 1, share.qualified_streams)
                .ok_or(RoyaltyError::Overflow)?;

        allocations.push(Allocation {
            creator_id: share.creator_id.clone(),
            result: RoyaltyCalculationResult {
                base_amount: amount,
                tier_multiplier_bps: share.tier_multiplier_bps,
                final_amount: amount,
                fraud_stream_count: share.fraud_streams,
                adjusted_amount,
                per_stream_rate,
            },
        });
    }

    tracing::trace!(
        pool_cents,
        creators = shares.len(),
        allocated = pool_cents - remaining_pool,
        "pool allocated"
    );

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_reference_numbers() {
        // pool $700, 80/100 streams, 2.0x tier, 10 fraud streams
        let result = calculate(70_000, 80, 100, 20_000, 10).expect("calculate");
        assert_eq!(result.base_amount, 56_000);
        assert_eq!(result.final_amount, 112_000);
        assert_eq!(result.adjusted_amount, 98_000);
        assert_eq!(result.per_stream_rate, 1_225);
        // The documented overshoot: a 2.0x creator's final amount can
        // exceed the whole pool. allocate() is what caps distribution.
        assert!(result.adjusted_amount > 70_000);
    }

    #[test]
    fn test_calculate_empty_platform_period() {
        let result = calculate(70_000, 0, 0, 15_000, 0).expect("calculate");
        assert_eq!(result.adjusted_amount, 0);
        assert_eq!(result.per_stream_rate, 0);
    }

    #[test]
    fn test_calculate_creator_without_streams() {
        let result = calculate(70_000, 0, 100, 15_000, 0).expect("calculate");
        assert_eq!(result.adjusted_amount, 0);
    }

    #[test]
    fn test_calculate_full_fraud() {
        let result = calculate(70_000, 50, 100, 10_000, 50).expect("calculate");
        assert_eq!(result.base_amount, 35_000);
        assert_eq!(result.adjusted_amount, 0);
    }

    #[test]
    fn test_calculate_inconsistent_counts() {
        assert!(calculate(70_000, 10, 100, 10_000, 11).is_err());
        assert!(calculate(70_000, 101, 100, 10_000, 0).is_err());
    }

    fn share(id: &str, qualified: u64, fraud: u64, mult: u64) -> CreatorShare {
        CreatorShare {
            creator_id: id.to_string(),
            qualified_streams: qualified,
            fraud_streams: fraud,
            tier_multiplier_bps: mult,
        }
    }

    #[test]
    fn test_allocate_single_creator_gets_pool() {
        let allocations =
            allocate(70_000, &[share("a", 80, 0, 20_000)]).expect("allocate");
        assert_eq!(allocations[0].result.base_amount, 70_000);
        assert_eq!(allocations[0].result.adjusted_amount, 70_000);
    }

    #[test]
    fn test_allocate_equal_weights() {
        let allocations = allocate(
            10_000,
            &[share("a", 50, 0, 10_000), share("b", 50, 0, 10_000)],
        )
        .expect("allocate");
        assert_eq!(allocations[0].result.adjusted_amount, 5_000);
        assert_eq!(allocations[1].result.adjusted_amount, 5_000);
    }

    #[test]
    fn test_allocate_multiplier_weighting() {
        // Same stream counts, one creator at 2.0x: weights 1:2
        let allocations = allocate(
            30_000,
            &[share("a", 100, 0, 10_000), share("b", 100, 0, 20_000)],
        )
        .expect("allocate");
        assert_eq!(allocations[0].result.adjusted_amount, 10_000);
        assert_eq!(allocations[1].result.adjusted_amount, 20_000);
    }

    #[test]
    fn test_allocate_never_exceeds_pool() {
        // The scenario where post-hoc multiplication would overshoot
        let allocations = allocate(
            70_000,
            &[share("a", 80, 10, 20_000), share("b", 20, 0, 10_000)],
        )
        .expect("allocate");
        let total: u64 = allocations.iter().map(|a| a.result.adjusted_amount).sum();
        assert!(total <= 70_000, "allocated {total} exceeds pool");

        let pre_fraud: u64 = allocations.iter().map(|a| a.result.base_amount).sum();
        assert_eq!(pre_fraud, 70_000, "pre-fraud allocation must exhaust pool");
    }

    #[test]
    fn test_allocate_awkward_pool_exhausts_exactly() {
        let shares = [
            share("a", 3, 0, 10_000),
            share("b", 3, 0, 10_000),
            share("c", 3, 0, 10_000),
        ];
        let allocations = allocate(1_000, &shares).expect("allocate");
        let total: u64 = allocations.iter().map(|a| a.result.base_amount).sum();
        assert_eq!(total, 1_000);
    }

    #[test]
    fn test_allocate_zero_stream_creator() {
        let allocations = allocate(
            10_000,
            &[share("a", 100, 0, 10_000), share("b", 0, 0, 20_000)],
        )
        .expect("allocate");
        assert_eq!(allocations[1].result.adjusted_amount, 0);
        assert_eq!(allocations[0].result.adjusted_amount, 10_000);
    }

    #[test]
    fn test_allocate_empty_shares() {
        let allocations = allocate(10_000, &[]).expect("allocate");
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_allocate_fraud_discount_applies_per_creator() {
        let allocations = allocate(
            20_000,
            &[share("clean", 50, 0, 10_000), share("flagged", 50, 25, 10_000)],
        )
        .expect("allocate");
        assert_eq!(allocations[0].result.adjusted_amount, 10_000);
        // Half the flagged creator's streams are fraudulent
        assert_eq!(allocations[1].result.adjusted_amount, 5_000);
    }
}

//! Period distribution batch.
//!
//! Splits a period's revenue into fund rows, then credits every eligible
//! creator's share of the creator pool and, for active priority artists,
//! the priority fund. Idempotency keys are period-scoped, so re-running a
//! period produces no new transactions.
//!
//! Partial failure policy: a failure crediting one creator is logged and
//! counted but never aborts the batch; the share stays uncredited for
//! manual reconciliation and is not removed from the fund balance. Only a
//! storage-layer failure is fatal.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use cadenza_db::queries::{audit, priority, streams, treasury};
use cadenza_db::DbError;
use cadenza_royalty::calculator::{allocate, Allocation, CreatorShare};
use cadenza_types::ledger::{FundKind, TransactionSource};
use cadenza_types::period::Period;

use crate::splits::FundSplit;
use crate::Result;

/// Outcome of one period distribution run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub period: Period,
    /// Per-fund allocation recorded for the period.
    pub allocations: Vec<(FundKind, u64)>,
    /// Credits written in this run.
    pub credited_count: u64,
    /// Credits skipped because the idempotency key already existed.
    pub duplicate_count: u64,
    /// Credits that failed and are left for manual reconciliation.
    pub failed_count: u64,
    /// Total cents credited in this run.
    pub credited_cents: u64,
}

/// Splits pooled revenue across funds and feeds creator shares into the
/// ledger. Constructed once at process start with a validated split.
#[derive(Clone, Debug)]
pub struct TreasuryDistributor {
    split: FundSplit,
}

impl TreasuryDistributor {
    /// Create a distributor, validating the fund split.
    pub fn new(split: FundSplit) -> Result<Self> {
        split.validate()?;
        Ok(Self { split })
    }

    /// Run the distribution for one period.
    pub fn distribute(
        &self,
        conn: &Connection,
        revenue_cents: u64,
        period: Period,
        now: u64,
    ) -> Result<DistributionSummary> {
        let allocations = self.split.split(revenue_cents)?;
        for (fund, amount) in &allocations {
            let inserted = treasury::record_allocation(conn, *fund, period, *amount as i64)?;
            if !inserted {
                tracing::debug!(
                    fund = fund.as_str(),
                    period_start = period.start,
                    "fund row already recorded for period"
                );
            }
        }

        let mut summary = DistributionSummary {
            period,
            allocations: allocations.clone(),
            credited_count: 0,
            duplicate_count: 0,
            failed_count: 0,
            credited_cents: 0,
        };

        let stats = streams::stats_for_period(conn, period)?;
        let mut shares = Vec::with_capacity(stats.len());
        for row in &stats {
            let tier = priority::tier(conn, &row.creator_id)?;
            shares.push(CreatorShare {
                creator_id: row.creator_id.clone(),
                qualified_streams: row.qualified_streams as u64,
                fraud_streams: row.fraud_streams as u64,
                tier_multiplier_bps: tier.multiplier_bps(),
            });
        }

        let creator_pool = fund_amount(&allocations, FundKind::CreatorPool);
        let pool_allocations = allocate(creator_pool, &shares)?;
        self.credit_batch(
            conn,
            &pool_allocations,
            TransactionSource::SubscriptionShare,
            "dist",
            period,
            now,
            &mut summary,
        )?;

        // Priority fund: same pro-rata weighting, restricted to creators
        // with an active designation.
        let active = priority::active_priority_creators(conn)?;
        let priority_shares: Vec<CreatorShare> = shares
            .iter()
            .filter(|s| active.contains(&s.creator_id))
            .cloned()
            .collect();
        if !priority_shares.is_empty() {
            let priority_pool = fund_amount(&allocations, FundKind::PriorityFund);
            let priority_allocations = allocate(priority_pool, &priority_shares)?;
            self.credit_batch(
                conn,
                &priority_allocations,
                TransactionSource::LicensingShare,
                "prio",
                period,
                now,
                &mut summary,
            )?;
        }

        audit::append(
            conn,
            "distribution_completed",
            None,
            Some(revenue_cents as i64),
            &serde_json::json!({
                "period_start": period.start,
                "period_end": period.end,
                "credited_count": summary.credited_count,
                "duplicate_count": summary.duplicate_count,
                "failed_count": summary.failed_count,
                "credited_cents": summary.credited_cents,
            }),
            now,
        )?;

        tracing::info!(
            period_start = period.start,
            revenue_cents,
            credited = summary.credited_count,
            duplicates = summary.duplicate_count,
            failed = summary.failed_count,
            "distribution run complete"
        );

        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn credit_batch(
        &self,
        conn: &Connection,
        allocations: &[Allocation],
        source: TransactionSource,
        key_namespace: &str,
        period: Period,
        now: u64,
        summary: &mut DistributionSummary,
    ) -> Result<()> {
        for allocation in allocations {
            let amount = allocation.result.adjusted_amount;
            if amount == 0 {
                continue;
            }
            let key = format!(
                "{key_namespace}:{}:{}:{}",
                allocation.creator_id, period.start, period.end
            );
            let metadata = serde_json::json!({
                "period_start": period.start,
                "period_end": period.end,
                "base_amount": allocation.result.base_amount,
                "tier_multiplier_bps": allocation.result.tier_multiplier_bps,
                "final_amount": allocation.result.final_amount,
                "fraud_stream_count": allocation.result.fraud_stream_count,
                "adjusted_amount": amount,
                "per_stream_rate": allocation.result.per_stream_rate,
            });

            match cadenza_db::queries::ledger::credit(
                conn,
                &allocation.creator_id,
                amount as i64,
                source,
                &key,
                Some(&metadata),
                now,
            ) {
                Ok(tx_id) => {
                    summary.credited_count += 1;
                    summary.credited_cents += amount;
                    audit::append(
                        conn,
                        "royalty_credited",
                        Some(&allocation.creator_id),
                        Some(amount as i64),
                        &serde_json::json!({
                            "transaction_id": tx_id,
                            "source": source.as_str(),
                            "period_start": period.start,
                            "period_end": period.end,
                        }),
                        now,
                    )?;
                }
                Err(DbError::Duplicate(_)) => {
                    // Re-run of an already-settled period: success-no-op.
                    summary.duplicate_count += 1;
                }
                Err(DbError::Validation(reason)) | Err(DbError::Constraint(reason)) => {
                    summary.failed_count += 1;
                    tracing::warn!(
                        creator = allocation.creator_id.as_str(),
                        amount,
                        reason = reason.as_str(),
                        "credit failed; share left for manual reconciliation"
                    );
                    audit::append(
                        conn,
                        "royalty_credit_failed",
                        Some(&allocation.creator_id),
                        Some(amount as i64),
                        &serde_json::json!({
                            "reason": reason,
                            "period_start": period.start,
                            "period_end": period.end,
                        }),
                        now,
                    )?;
                }
                // Storage outage: fatal to the batch.
                Err(other) => return Err(other.into()),
            }
        }
        Ok(())
    }
}

fn fund_amount(allocations: &[(FundKind, u64)], fund: FundKind) -> u64 {
    allocations
        .iter()
        .find(|(f, _)| *f == fund)
        .map(|(_, a)| *a)
        .unwrap_or(0)
}

/// Pay the period's infrastructure cost from the platform-ops fund.
///
/// Insufficient balance skips the payment entirely — never a partial
/// debit — and reports it via [`TreasuryError::InsufficientFunds`] and an
/// audit entry. Returns the fund balance remaining after the debit.
pub fn pay_infrastructure(
    conn: &Connection,
    period: Period,
    cost_cents: i64,
    now: u64,
) -> Result<i64> {
    let debited = treasury::try_debit_fund(conn, FundKind::PlatformOps, period, cost_cents)?;
    if !debited {
        let available = treasury::fund_balance(conn, FundKind::PlatformOps, period)?;
        audit::append(
            conn,
            "infra_payment_skipped",
            None,
            Some(cost_cents),
            &serde_json::json!({
                "available_cents": available,
                "period_start": period.start,
            }),
            now,
        )?;
        return Err(crate::TreasuryError::InsufficientFunds {
            fund: FundKind::PlatformOps.as_str(),
            needed: cost_cents,
            available,
        });
    }

    let remaining = treasury::fund_balance(conn, FundKind::PlatformOps, period)?;
    audit::append(
        conn,
        "infra_payment",
        None,
        Some(cost_cents),
        &serde_json::json!({
            "period_start": period.start,
            "remaining_cents": remaining,
        }),
        now,
    )?;
    tracing::info!(cost_cents, remaining, period_start = period.start, "infrastructure paid");

    Ok(remaining)
}

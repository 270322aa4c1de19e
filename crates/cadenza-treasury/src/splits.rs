//! Fund percentage table and exact splitting.
//!
//! A period's pooled revenue is split across five named funds. The
//! percentages must always sum to 100 and are validated once at daemon
//! startup. Splitting is exact: per-fund amounts always sum to the
//! revenue, with the rounding residual awarded to platform operations.

use serde::{Deserialize, Serialize};

use cadenza_types::ledger::FundKind;

use crate::{Result, TreasuryError};

/// Default platform operations share percentage.
pub const DEFAULT_PLATFORM_OPS_PCT: u8 = 30;

/// Default priority-artist fund share percentage.
pub const DEFAULT_PRIORITY_FUND_PCT: u8 = 10;

/// Default governance share percentage.
pub const DEFAULT_GOVERNANCE_PCT: u8 = 5;

/// Default R&D share percentage.
pub const DEFAULT_RESEARCH_DEV_PCT: u8 = 5;

/// Default general creator pool share percentage.
pub const DEFAULT_CREATOR_POOL_PCT: u8 = 50;

/// Fund split configuration for a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSplit {
    /// Platform operations share percentage.
    pub platform_ops_pct: u8,
    /// Priority-artist fund share percentage.
    pub priority_fund_pct: u8,
    /// Governance share percentage.
    pub governance_pct: u8,
    /// R&D share percentage.
    pub research_dev_pct: u8,
    /// General creator pool share percentage.
    pub creator_pool_pct: u8,
}

/// Default split: ops=30, priority=10, governance=5, r&d=5, creators=50.
pub const DEFAULT_SPLIT: FundSplit = FundSplit {
    platform_ops_pct: DEFAULT_PLATFORM_OPS_PCT,
    priority_fund_pct: DEFAULT_PRIORITY_FUND_PCT,
    governance_pct: DEFAULT_GOVERNANCE_PCT,
    research_dev_pct: DEFAULT_RESEARCH_DEV_PCT,
    creator_pool_pct: DEFAULT_CREATOR_POOL_PCT,
};

impl Default for FundSplit {
    fn default() -> Self {
        DEFAULT_SPLIT
    }
}

impl FundSplit {
    /// Percentage for a fund.
    pub fn pct(&self, fund: FundKind) -> u8 {
        match fund {
            FundKind::PlatformOps => self.platform_ops_pct,
            FundKind::PriorityFund => self.priority_fund_pct,
            FundKind::Governance => self.governance_pct,
            FundKind::ResearchDev => self.research_dev_pct,
            FundKind::CreatorPool => self.creator_pool_pct,
        }
    }

    /// Validate that percentages sum to exactly 100.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::InvalidSplitTotal`] if they do not
    pub fn validate(&self) -> Result<()> {
        let total = FundKind::ALL
            .iter()
            .map(|fund| self.pct(*fund) as u16)
            .sum::<u16>();
        if total != 100 {
            return Err(TreasuryError::InvalidSplitTotal { total });
        }
        Ok(())
    }

    /// Split a revenue amount across the funds.
    ///
    /// Returns `(fund, amount)` pairs in [`FundKind::ALL`] order. The
    /// non-ops funds are computed by truncating division and platform
    /// operations receives the remainder, so the amounts always sum to
    /// `revenue_cents` exactly.
    ///
    /// # Errors
    ///
    /// - [`TreasuryError::InvalidSplitTotal`] if the split is invalid
    /// - [`TreasuryError::Overflow`] on arithmetic overflow
    pub fn split(&self, revenue_cents: u64) -> Result<Vec<(FundKind, u64)>> {
        self.validate()?;

        let mut amounts = Vec::with_capacity(FundKind::ALL.len());
        let mut allocated: u64 = 0;
        for fund in FundKind::ALL {
            if fund == FundKind::PlatformOps {
                continue;
            }
            let amount = revenue_cents
                .checked_mul(self.pct(fund) as u64)
                .ok_or(TreasuryError::Overflow)?
                / 100;
            allocated += amount;
            amounts.push((fund, amount));
        }

        // Platform ops absorbs the rounding residual
        let ops_amount = revenue_cents - allocated;
        amounts.insert(0, (FundKind::PlatformOps, ops_amount));

        Ok(amounts)
    }
}

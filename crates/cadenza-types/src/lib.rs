//! # cadenza-types
//!
//! Shared domain types used across the Cadenza workspace: identifiers,
//! integer cent arithmetic, revenue periods, and the enumerated codes for
//! transaction sources, payout channels, creator tiers, and treasury funds.

pub mod country;
pub mod events;
pub mod ledger;
pub mod money;
pub mod period;
pub mod tier;

/// Creator identifier as issued by the storefront service.
pub type CreatorId = String;

/// Row id of an appended ledger transaction.
pub type TransactionId = i64;

/// Row id of a payout attempt.
pub type PayoutId = i64;

/// Cents per dollar (all monetary amounts are integer minor units).
pub const CENTS_PER_DOLLAR: i64 = 100;

/// Default minimum payout threshold ($50).
pub const DEFAULT_MIN_PAYOUT_CENTS: i64 = 5_000;

/// Minimum play duration for a stream to count as qualified.
pub const MIN_QUALIFIED_DURATION_SECS: u32 = 30;

/// Fraud score above which a qualified stream is counted as fraudulent.
pub const FRAUD_SCORE_CUTOFF: f64 = 0.7;

/// Scale of tier multipliers and withholding rates (10_000 = 1.0x / 100%).
pub const BPS_SCALE: u64 = 10_000;

/// Error returned when a stored or wire code does not match any variant.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized {kind} code: {value}")]
pub struct CodeParseError {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The offending code.
    pub value: String,
}

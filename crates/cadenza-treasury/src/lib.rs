//! # cadenza-treasury
//!
//! Treasury fund accounting: splits a period's pooled revenue across the
//! named platform funds and fans the creator-pool and priority-fund
//! shares out to ledger credits.
//!
//! ## Modules
//!
//! - [`splits`] — fund percentage table and exact splitting
//! - [`distributor`] — the period distribution batch

pub mod distributor;
pub mod splits;

use cadenza_db::DbError;
use cadenza_royalty::RoyaltyError;

/// Error types for treasury operations.
#[derive(Debug, thiserror::Error)]
pub enum TreasuryError {
    /// Fund percentages do not sum to 100.
    #[error("fund percentages must sum to 100, got {total}")]
    InvalidSplitTotal {
        /// The actual total.
        total: u16,
    },

    /// A fund balance cannot cover a requested debit.
    #[error("insufficient balance in {fund}: need {needed}, have {available}")]
    InsufficientFunds {
        /// Fund code.
        fund: &'static str,
        /// Amount requested, cents.
        needed: i64,
        /// Amount available, cents.
        available: i64,
    },

    /// Arithmetic overflow while splitting.
    #[error("arithmetic overflow in fund split")]
    Overflow,

    /// Royalty math failed.
    #[error(transparent)]
    Royalty(#[from] RoyaltyError),

    /// Storage-layer failure; fatal to the batch.
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Convenience result type for treasury operations.
pub type Result<T> = std::result::Result<T, TreasuryError>;

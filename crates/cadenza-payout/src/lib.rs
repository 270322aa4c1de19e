//! # cadenza-payout
//!
//! Payout orchestration: tax withholding, channel selection with ordered
//! fallback, manual-invoice confirmation, and processor webhook
//! reconciliation.
//!
//! ## Modules
//!
//! - [`tax`] — withholding rate/threshold table by country
//! - [`channel`] — the payout gateway seam and its v1 stub
//! - [`orchestrator`] — reserve, withhold, attempt channels, audit

pub mod channel;
pub mod orchestrator;
pub mod tax;

use cadenza_db::DbError;

/// Error types for payout operations.
#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    /// Every channel in the candidate list failed. Unreachable in
    /// practice because manual invoice cannot fail; the reservation has
    /// been restored.
    #[error("all payout channels failed for {creator_id}")]
    AllChannelsFailed {
        /// The account whose reservation was restored.
        creator_id: String,
    },

    /// Confirmation targeted a payout that is not a pending manual
    /// invoice.
    #[error("payout {0} is not a pending manual invoice")]
    NotPendingInvoice(i64),

    /// Storage-layer failure.
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Convenience result type for payout operations.
pub type Result<T> = std::result::Result<T, PayoutError>;

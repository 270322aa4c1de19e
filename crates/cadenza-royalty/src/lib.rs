//! # cadenza-royalty
//!
//! Royalty math: fraud stream analysis and the pro-rata calculator.
//! Everything here is a pure function of its inputs; persistence and
//! crediting live elsewhere.
//!
//! ## Modules
//!
//! - [`fraud`] — qualified/fraud stream counting over event batches
//! - [`calculator`] — pool share, tier multiplier, fraud discount

pub mod calculator;
pub mod fraud;

/// Error types for royalty calculations.
#[derive(Debug, thiserror::Error)]
pub enum RoyaltyError {
    /// A share's stream counts are inconsistent.
    #[error("invalid share: {0}")]
    InvalidShare(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in royalty calculation")]
    Overflow,
}

/// Convenience result type for royalty operations.
pub type Result<T> = std::result::Result<T, RoyaltyError>;

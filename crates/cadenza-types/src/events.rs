//! Collaborator-facing input types.
//!
//! These structures arrive from external services: the stream event
//! pipeline, the billing service's period revenue reports, and the
//! storefront's creator payout profiles. Cadenza consumes them; it does
//! not produce them.

use serde::{Deserialize, Serialize};

use crate::country::Country;
use crate::ledger::PayoutMethod;
use crate::period::Period;
use crate::CreatorId;

/// A single play/view event from the stream pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamEvent {
    pub creator_id: CreatorId,
    pub viewer_id: String,
    pub duration_seconds: u32,
    /// Externally supplied fraud score in [0, 1].
    pub fraud_score: f64,
    /// Unix seconds.
    pub timestamp: u64,
}

impl StreamEvent {
    /// Whether this event counts toward royalty share.
    pub fn is_qualified(&self, min_duration_secs: u32) -> bool {
        self.duration_seconds >= min_duration_secs
    }
}

/// A period revenue total from the billing service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevenueReport {
    pub period: Period,
    pub total_revenue_cents: u64,
    /// e.g. "subscription", "licensing".
    pub source_type: String,
}

/// A creator's payout capabilities and tax country.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PayoutProfile {
    pub connect_account_id: Option<String>,
    pub bank_iban: Option<String>,
    pub crypto_wallet: Option<String>,
    pub crypto_asset_type: Option<String>,
    #[serde(default = "default_country")]
    pub country: Country,
}

fn default_country() -> Country {
    Country::Other
}

impl PayoutProfile {
    /// Ordered payout channel candidates for this profile.
    ///
    /// Channels are tried in this order until one succeeds. Manual invoice
    /// is always last and always present, so the list is never empty.
    pub fn channel_candidates(&self) -> Vec<PayoutMethod> {
        let mut candidates = Vec::with_capacity(4);
        if self.connect_account_id.is_some() {
            candidates.push(PayoutMethod::Connect);
        }
        if self.bank_iban.is_some() {
            candidates.push(PayoutMethod::Bank);
        }
        if self.crypto_wallet.is_some() && self.crypto_asset_type.is_some() {
            candidates.push(PayoutMethod::Crypto);
        }
        candidates.push(PayoutMethod::ManualInvoice);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(duration: u32) -> StreamEvent {
        StreamEvent {
            creator_id: "creator-1".to_string(),
            viewer_id: "viewer-1".to_string(),
            duration_seconds: duration,
            fraud_score: 0.0,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_qualification_threshold() {
        assert!(!event(29).is_qualified(30));
        assert!(event(30).is_qualified(30));
        assert!(event(31).is_qualified(30));
    }

    #[test]
    fn test_full_profile_candidate_order() {
        let profile = PayoutProfile {
            connect_account_id: Some("acct_1".to_string()),
            bank_iban: Some("DE89370400440532013000".to_string()),
            crypto_wallet: Some("0xabc".to_string()),
            crypto_asset_type: Some("usdc".to_string()),
            country: Country::Germany,
        };
        assert_eq!(
            profile.channel_candidates(),
            vec![
                PayoutMethod::Connect,
                PayoutMethod::Bank,
                PayoutMethod::Crypto,
                PayoutMethod::ManualInvoice,
            ]
        );
    }

    #[test]
    fn test_empty_profile_falls_back_to_invoice() {
        let profile = PayoutProfile::default();
        assert_eq!(
            profile.channel_candidates(),
            vec![PayoutMethod::ManualInvoice]
        );
    }

    #[test]
    fn test_crypto_requires_wallet_and_asset() {
        let profile = PayoutProfile {
            crypto_wallet: Some("0xabc".to_string()),
            crypto_asset_type: None,
            ..PayoutProfile::default()
        };
        assert_eq!(
            profile.channel_candidates(),
            vec![PayoutMethod::ManualInvoice]
        );
    }
}

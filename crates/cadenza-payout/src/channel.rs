//! Payout gateway seam.
//!
//! External transfers go through the [`PayoutGateway`] trait, one method
//! per channel. The caller supplies the idempotency `reference` for the
//! transfer; a retry with the same reference must not move money twice on
//! the processor side. Calls are blocking network operations with a
//! timeout enforced by the implementation; a timeout surfaces as
//! [`ChannelError::Timeout`] even though the external operation may have
//! succeeded — the webhook reconciliation path settles that case.
//!
//! [`StubGateway`] is the v1 in-tree implementation: it accepts every
//! transfer without calling anything, which keeps the rest of the payout
//! machinery functional before processor credentials are provisioned.

use cadenza_types::events::PayoutProfile;
use cadenza_types::ledger::PayoutMethod;

/// Error from a single channel attempt.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The call did not complete in time. The external operation may
    /// still have succeeded.
    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The processor rejected the transfer.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ChannelError {
    /// Short code for payout failure records.
    pub fn as_reason(&self) -> String {
        self.to_string()
    }
}

/// External payout transfer calls, one per channel.
pub trait PayoutGateway {
    /// Transfer to a processor-connect account.
    fn connect_transfer(
        &self,
        reference: &str,
        account_id: &str,
        net_cents: u64,
    ) -> Result<(), ChannelError>;

    /// SEPA/SWIFT bank transfer.
    fn bank_transfer(&self, reference: &str, iban: &str, net_cents: u64)
        -> Result<(), ChannelError>;

    /// Crypto wallet transfer.
    fn crypto_transfer(
        &self,
        reference: &str,
        wallet: &str,
        asset: &str,
        net_cents: u64,
    ) -> Result<(), ChannelError>;
}

/// A gateway that accepts every transfer (v1, no processor credentials).
#[derive(Clone, Debug, Default)]
pub struct StubGateway;

impl PayoutGateway for StubGateway {
    fn connect_transfer(
        &self,
        reference: &str,
        account_id: &str,
        net_cents: u64,
    ) -> Result<(), ChannelError> {
        tracing::info!(reference, account_id, net_cents, "stub connect transfer accepted");
        Ok(())
    }

    fn bank_transfer(
        &self,
        reference: &str,
        iban: &str,
        net_cents: u64,
    ) -> Result<(), ChannelError> {
        tracing::info!(reference, iban, net_cents, "stub bank transfer accepted");
        Ok(())
    }

    fn crypto_transfer(
        &self,
        reference: &str,
        wallet: &str,
        asset: &str,
        net_cents: u64,
    ) -> Result<(), ChannelError> {
        tracing::info!(reference, wallet, asset, net_cents, "stub crypto transfer accepted");
        Ok(())
    }
}

/// Dispatch one channel attempt against the gateway.
///
/// Manual invoice never reaches the gateway; the orchestrator records it
/// directly.
pub fn attempt<G: PayoutGateway>(
    gateway: &G,
    method: PayoutMethod,
    reference: &str,
    profile: &PayoutProfile,
    net_cents: u64,
) -> Result<(), ChannelError> {
    match method {
        PayoutMethod::Connect => {
            let account_id = profile
                .connect_account_id
                .as_deref()
                .ok_or_else(|| ChannelError::Rejected("no connect account".into()))?;
            gateway.connect_transfer(reference, account_id, net_cents)
        }
        PayoutMethod::Bank => {
            let iban = profile
                .bank_iban
                .as_deref()
                .ok_or_else(|| ChannelError::Rejected("no bank account".into()))?;
            gateway.bank_transfer(reference, iban, net_cents)
        }
        PayoutMethod::Crypto => {
            let (wallet, asset) = match (&profile.crypto_wallet, &profile.crypto_asset_type) {
                (Some(w), Some(a)) => (w.as_str(), a.as_str()),
                _ => return Err(ChannelError::Rejected("no crypto wallet".into())),
            };
            gateway.crypto_transfer(reference, wallet, asset, net_cents)
        }
        PayoutMethod::ManualInvoice => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_accepts_everything() {
        let gateway = StubGateway;
        assert!(gateway.connect_transfer("r1", "acct_1", 100).is_ok());
        assert!(gateway.bank_transfer("r2", "DE89", 100).is_ok());
        assert!(gateway.crypto_transfer("r3", "0xabc", "usdc", 100).is_ok());
    }

    #[test]
    fn test_attempt_rejects_missing_capability() {
        let gateway = StubGateway;
        let profile = PayoutProfile::default();
        assert!(attempt(&gateway, PayoutMethod::Connect, "r1", &profile, 100).is_err());
        assert!(attempt(&gateway, PayoutMethod::Bank, "r2", &profile, 100).is_err());
        assert!(attempt(&gateway, PayoutMethod::Crypto, "r3", &profile, 100).is_err());
    }

    #[test]
    fn test_attempt_dispatches_configured_channel() {
        let gateway = StubGateway;
        let profile = PayoutProfile {
            connect_account_id: Some("acct_1".to_string()),
            ..PayoutProfile::default()
        };
        assert!(attempt(&gateway, PayoutMethod::Connect, "r1", &profile, 100).is_ok());
    }
}

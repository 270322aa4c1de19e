//! Payout orchestration.
//!
//! For an account at or above its payout threshold: reserve the balance,
//! compute withholding from the creator's country, then try channels in
//! the profile's candidate order. Every attempt gets its own payout row;
//! the reservation is not restored between attempts — the same reserved
//! amount rides through the fallback chain. Manual invoice closes the
//! chain by recording a human-actionable pending payout.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use cadenza_db::queries::payouts::PayoutRow;
use cadenza_db::queries::{audit, ledger, payouts, profiles};
use cadenza_types::ledger::{PayoutMethod, PayoutStatus};
use cadenza_types::PayoutId;

use crate::channel::{attempt, PayoutGateway};
use crate::tax;
use crate::{PayoutError, Result};

/// Outcome of processing one account.
#[derive(Clone, Debug)]
pub enum PayoutOutcome {
    /// Balance below the account's threshold; nothing was moved.
    BelowThreshold {
        balance_cents: i64,
        min_payout_cents: i64,
    },
    /// An external channel accepted the transfer.
    Completed(PayoutRow),
    /// Manual invoice recorded; awaits operator confirmation.
    InvoicePending(PayoutRow),
}

/// Outcome of a webhook reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// Webhook agrees with the local record; no-op.
    Consistent,
    /// Webhook disagrees with (or is unknown to) the local record. An
    /// audit entry was written; the local record is never auto-corrected.
    Mismatch {
        payout_id: Option<PayoutId>,
        local_status: Option<String>,
        reported_completed: bool,
    },
}

/// Counters from a payout batch run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PayoutBatchSummary {
    pub processed: u64,
    pub completed: u64,
    pub invoiced: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Drives payouts through the gateway. Constructed once at process start
/// and shared by reference.
#[derive(Clone, Debug)]
pub struct PayoutOrchestrator<G: PayoutGateway> {
    gateway: G,
}

impl<G: PayoutGateway> PayoutOrchestrator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Process one account's payout.
    pub fn process_payout(
        &self,
        conn: &Connection,
        creator_id: &str,
        now: u64,
    ) -> Result<PayoutOutcome> {
        let account = ledger::account(conn, creator_id)?;
        let reserved = ledger::reserve_for_payout(conn, creator_id)?;

        if reserved < account.min_payout_cents {
            ledger::restore_reservation(conn, creator_id, reserved)?;
            audit::append(
                conn,
                "payout_skipped",
                Some(creator_id),
                Some(reserved),
                &serde_json::json!({
                    "reason": "below threshold",
                    "min_payout_cents": account.min_payout_cents,
                }),
                now,
            )?;
            return Ok(PayoutOutcome::BelowThreshold {
                balance_cents: reserved,
                min_payout_cents: account.min_payout_cents,
            });
        }

        let profile = profiles::get(conn, creator_id)?.unwrap_or_default();
        let withholding = tax::compute(profile.country, reserved as u64);

        for method in profile.channel_candidates() {
            let payout_id = payouts::insert_attempt(
                conn,
                creator_id,
                method,
                withholding.gross_cents as i64,
                withholding.tax_cents as i64,
                withholding.net_cents as i64,
                now,
            )?;

            if method == PayoutMethod::ManualInvoice {
                // Cannot fail: the record itself is the deliverable. The
                // reservation is consumed; mark_paid waits for the
                // operator confirmation.
                audit::append(
                    conn,
                    "payout_invoice_created",
                    Some(creator_id),
                    Some(withholding.gross_cents as i64),
                    &serde_json::json!({
                        "payout_id": payout_id,
                        "tax_cents": withholding.tax_cents,
                        "net_cents": withholding.net_cents,
                    }),
                    now,
                )?;
                tracing::info!(
                    creator = creator_id,
                    payout_id,
                    net_cents = withholding.net_cents,
                    "manual invoice recorded"
                );
                return Ok(PayoutOutcome::InvoicePending(payouts::get(conn, payout_id)?));
            }

            let reference = format!("cad-{payout_id}");
            match attempt(&self.gateway, method, &reference, &profile, withholding.net_cents) {
                Ok(()) => {
                    payouts::mark_completed(conn, payout_id, Some(&reference), now)?;
                    // The ledger records the gross leaving the account;
                    // the tax/net breakdown lives on the payout row.
                    ledger::mark_paid(conn, creator_id, withholding.gross_cents as i64)?;
                    audit::append(
                        conn,
                        "payout_completed",
                        Some(creator_id),
                        Some(withholding.gross_cents as i64),
                        &serde_json::json!({
                            "payout_id": payout_id,
                            "method": method.as_str(),
                            "tax_cents": withholding.tax_cents,
                            "net_cents": withholding.net_cents,
                            "external_reference": reference,
                        }),
                        now,
                    )?;
                    tracing::info!(
                        creator = creator_id,
                        payout_id,
                        method = method.as_str(),
                        net_cents = withholding.net_cents,
                        "payout completed"
                    );
                    return Ok(PayoutOutcome::Completed(payouts::get(conn, payout_id)?));
                }
                Err(err) => {
                    // A timeout may have succeeded on the processor side;
                    // the stored reference lets the webhook reconcile it.
                    let reason = err.as_reason();
                    payouts::mark_failed(conn, payout_id, Some(&reference), &reason, now)?;
                    audit::append(
                        conn,
                        "payout_channel_failed",
                        Some(creator_id),
                        Some(withholding.gross_cents as i64),
                        &serde_json::json!({
                            "payout_id": payout_id,
                            "method": method.as_str(),
                            "reason": reason,
                            "external_reference": reference,
                        }),
                        now,
                    )?;
                    tracing::warn!(
                        creator = creator_id,
                        payout_id,
                        method = method.as_str(),
                        reason = reason.as_str(),
                        "payout channel failed, falling through"
                    );
                    // Keep the reservation and try the next channel.
                }
            }
        }

        // The candidate list always ends in manual invoice, so this is
        // unreachable; restore anyway so no reservation can be stranded.
        ledger::restore_reservation(conn, creator_id, reserved)?;
        Err(PayoutError::AllChannelsFailed {
            creator_id: creator_id.to_string(),
        })
    }

    /// Process every account at or above its threshold.
    ///
    /// Per-account failures are isolated and counted; only a storage
    /// outage aborts the batch.
    pub fn run_batch(&self, conn: &Connection, now: u64) -> Result<PayoutBatchSummary> {
        let mut summary = PayoutBatchSummary::default();
        for account in ledger::accounts_above_threshold(conn)? {
            summary.processed += 1;
            match self.process_payout(conn, &account.creator_id, now) {
                Ok(PayoutOutcome::Completed(_)) => summary.completed += 1,
                Ok(PayoutOutcome::InvoicePending(_)) => summary.invoiced += 1,
                Ok(PayoutOutcome::BelowThreshold { .. }) => summary.skipped += 1,
                Err(PayoutError::Storage(err)) => return Err(PayoutError::Storage(err)),
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        creator = account.creator_id.as_str(),
                        error = %err,
                        "payout failed for account"
                    );
                }
            }
        }
        tracing::info!(
            processed = summary.processed,
            completed = summary.completed,
            invoiced = summary.invoiced,
            "payout batch complete"
        );
        Ok(summary)
    }
}

/// Confirm a pending manual invoice as paid.
pub fn confirm_manual_invoice(
    conn: &Connection,
    payout_id: PayoutId,
    now: u64,
) -> Result<PayoutRow> {
    let row = payouts::get(conn, payout_id)?;
    if row.method != PayoutMethod::ManualInvoice.as_str()
        || row.status != PayoutStatus::Pending.as_str()
    {
        return Err(PayoutError::NotPendingInvoice(payout_id));
    }

    payouts::mark_completed(conn, payout_id, None, now)?;
    ledger::mark_paid(conn, &row.creator_id, row.gross_cents)?;
    audit::append(
        conn,
        "payout_invoice_confirmed",
        Some(&row.creator_id),
        Some(row.gross_cents),
        &serde_json::json!({"payout_id": payout_id}),
        now,
    )?;

    payouts::get(conn, payout_id).map_err(Into::into)
}

/// Reconcile a processor webhook against the local payout record.
///
/// Idempotent by `external_reference`. Agreement is a no-op; any
/// disagreement — including a reference with no local record — writes a
/// `reconciliation_mismatch` audit entry for manual review and leaves the
/// local record untouched.
pub fn reconcile(
    conn: &Connection,
    external_reference: &str,
    reported_completed: bool,
    now: u64,
) -> Result<ReconcileOutcome> {
    let local = payouts::find_by_external_reference(conn, external_reference)?;

    let (payout_id, local_status) = match &local {
        Some(row) => (Some(row.id), Some(row.status.clone())),
        None => (None, None),
    };

    let consistent = matches!(
        (local_status.as_deref(), reported_completed),
        (Some("completed"), true) | (Some("failed"), false)
    );
    if consistent {
        return Ok(ReconcileOutcome::Consistent);
    }

    audit::append(
        conn,
        "reconciliation_mismatch",
        local.as_ref().map(|r| r.creator_id.as_str()),
        local.as_ref().map(|r| r.gross_cents),
        &serde_json::json!({
            "external_reference": external_reference,
            "payout_id": payout_id,
            "local_status": local_status,
            "reported_completed": reported_completed,
        }),
        now,
    )?;
    tracing::warn!(
        external_reference,
        ?payout_id,
        reported_completed,
        "webhook state inconsistent with local payout record"
    );

    Ok(ReconcileOutcome::Mismatch {
        payout_id,
        local_status,
        reported_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelError, StubGateway};
    use cadenza_db::queries::profiles;
    use cadenza_types::country::Country;
    use cadenza_types::events::PayoutProfile;
    use cadenza_types::ledger::TransactionSource;

    fn test_db() -> Connection {
        cadenza_db::open_memory().expect("open test db")
    }

    fn credit(conn: &Connection, creator: &str, cents: i64) {
        ledger::credit(
            conn,
            creator,
            cents,
            TransactionSource::SubscriptionShare,
            &format!("seed-{creator}-{cents}"),
            None,
            100,
        )
        .expect("credit");
    }

    fn us_connect_profile() -> PayoutProfile {
        PayoutProfile {
            connect_account_id: Some("acct_1".to_string()),
            country: Country::UnitedStates,
            ..PayoutProfile::default()
        }
    }

    /// Gateway that fails connect and bank, used for fallback tests.
    struct FailingGateway;

    impl PayoutGateway for FailingGateway {
        fn connect_transfer(
            &self,
            _reference: &str,
            _account_id: &str,
            _net_cents: u64,
        ) -> std::result::Result<(), ChannelError> {
            Err(ChannelError::Timeout { timeout_secs: 30 })
        }

        fn bank_transfer(
            &self,
            _reference: &str,
            _iban: &str,
            _net_cents: u64,
        ) -> std::result::Result<(), ChannelError> {
            Err(ChannelError::Rejected("account closed".into()))
        }

        fn crypto_transfer(
            &self,
            _reference: &str,
            _wallet: &str,
            _asset: &str,
            _net_cents: u64,
        ) -> std::result::Result<(), ChannelError> {
            Err(ChannelError::Rejected("unsupported asset".into()))
        }
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let conn = test_db();
        credit(&conn, "c1", 4_500);

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let outcome = orchestrator.process_payout(&conn, "c1", 200).expect("process");

        assert!(matches!(
            outcome,
            PayoutOutcome::BelowThreshold {
                balance_cents: 4_500,
                min_payout_cents: 5_000,
            }
        ));
        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 4_500);
        assert_eq!(acct.total_paid_out, 0);
    }

    #[test]
    fn test_connect_payout_below_reporting_threshold() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);
        profiles::upsert(&conn, "c1", &us_connect_profile(), 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let outcome = orchestrator.process_payout(&conn, "c1", 200).expect("process");

        let row = match outcome {
            PayoutOutcome::Completed(row) => row,
            other => panic!("expected completed payout, got {other:?}"),
        };
        assert_eq!(row.method, "connect");
        assert_eq!(row.gross_cents, 6_000);
        assert_eq!(row.tax_cents, 0);
        assert_eq!(row.net_cents, 6_000);

        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 0);
        assert_eq!(acct.total_paid_out, 6_000);
        assert_eq!(acct.balance, acct.total_earned - acct.total_paid_out);
    }

    #[test]
    fn test_withholding_above_reporting_threshold() {
        let conn = test_db();
        credit(&conn, "c1", 100_000);
        profiles::upsert(&conn, "c1", &us_connect_profile(), 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let outcome = orchestrator.process_payout(&conn, "c1", 200).expect("process");

        let row = match outcome {
            PayoutOutcome::Completed(row) => row,
            other => panic!("expected completed payout, got {other:?}"),
        };
        assert_eq!(row.gross_cents, 100_000);
        assert_eq!(row.tax_cents, 24_000);
        assert_eq!(row.net_cents, 76_000);

        // The ledger sees the gross; tax is withheld externally.
        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.total_paid_out, 100_000);
    }

    #[test]
    fn test_all_channels_fail_falls_to_invoice() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);
        let profile = PayoutProfile {
            connect_account_id: Some("acct_1".to_string()),
            bank_iban: Some("DE89370400440532013000".to_string()),
            country: Country::UnitedStates,
            ..PayoutProfile::default()
        };
        profiles::upsert(&conn, "c1", &profile, 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(FailingGateway);
        let outcome = orchestrator.process_payout(&conn, "c1", 200).expect("process");

        let row = match outcome {
            PayoutOutcome::InvoicePending(row) => row,
            other => panic!("expected pending invoice, got {other:?}"),
        };
        assert_eq!(row.method, "manual-invoice");
        assert_eq!(row.status, "pending");

        // Reservation consumed, not restored; balance stays zero and the
        // payout is not yet reflected in lifetime totals.
        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 0);
        assert_eq!(acct.total_paid_out, 0);

        // Both failed attempts preserved with their references
        let history = payouts::history(&conn, "c1", 10).expect("history");
        assert_eq!(history.len(), 3);
        let failed: Vec<_> = history.iter().filter(|r| r.status == "failed").collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|r| r.external_reference.is_some()));
    }

    #[test]
    fn test_no_profile_goes_straight_to_invoice() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let outcome = orchestrator.process_payout(&conn, "c1", 200).expect("process");
        assert!(matches!(outcome, PayoutOutcome::InvoicePending(_)));
    }

    #[test]
    fn test_confirm_manual_invoice() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let row = match orchestrator.process_payout(&conn, "c1", 200).expect("process") {
            PayoutOutcome::InvoicePending(row) => row,
            other => panic!("expected invoice, got {other:?}"),
        };

        let confirmed = confirm_manual_invoice(&conn, row.id, 300).expect("confirm");
        assert_eq!(confirmed.status, "completed");

        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.total_paid_out, 6_000);
        assert_eq!(acct.balance, acct.total_earned - acct.total_paid_out);

        // Confirmation is not repeatable
        assert!(matches!(
            confirm_manual_invoice(&conn, row.id, 400),
            Err(PayoutError::NotPendingInvoice(_))
        ));
    }

    #[test]
    fn test_credits_after_reservation_are_not_conflated() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);
        profiles::upsert(&conn, "c1", &us_connect_profile(), 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        orchestrator.process_payout(&conn, "c1", 200).expect("process");

        // A fresh credit lands on the post-reservation balance
        ledger::credit(
            &conn,
            "c1",
            1_000,
            TransactionSource::Tip,
            "tip-after",
            None,
            300,
        )
        .expect("credit");
        let acct = ledger::account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 1_000);
        assert_eq!(acct.total_paid_out, 6_000);
    }

    #[test]
    fn test_run_batch_only_touches_eligible_accounts() {
        let conn = test_db();
        credit(&conn, "eligible", 6_000);
        credit(&conn, "small", 1_000);
        profiles::upsert(&conn, "eligible", &us_connect_profile(), 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let summary = orchestrator.run_batch(&conn, 200).expect("batch");
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.completed, 1);

        assert_eq!(ledger::account(&conn, "small").expect("account").balance, 1_000);
    }

    #[test]
    fn test_reconcile_consistent() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);
        profiles::upsert(&conn, "c1", &us_connect_profile(), 100).expect("profile");
        let orchestrator = PayoutOrchestrator::new(StubGateway);
        let row = match orchestrator.process_payout(&conn, "c1", 200).expect("process") {
            PayoutOutcome::Completed(row) => row,
            other => panic!("expected completed, got {other:?}"),
        };
        let reference = row.external_reference.expect("reference");

        let outcome = reconcile(&conn, &reference, true, 300).expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Consistent);
    }

    #[test]
    fn test_reconcile_mismatch_is_logged_not_corrected() {
        let conn = test_db();
        credit(&conn, "c1", 6_000);
        let profile = PayoutProfile {
            connect_account_id: Some("acct_1".to_string()),
            country: Country::UnitedStates,
            ..PayoutProfile::default()
        };
        profiles::upsert(&conn, "c1", &profile, 100).expect("profile");

        let orchestrator = PayoutOrchestrator::new(FailingGateway);
        orchestrator.process_payout(&conn, "c1", 200).expect("process");

        let failed = payouts::history(&conn, "c1", 10)
            .expect("history")
            .into_iter()
            .find(|r| r.status == "failed")
            .expect("failed attempt");
        let reference = failed.external_reference.expect("reference");

        // The processor says the timed-out transfer actually went through
        let outcome = reconcile(&conn, &reference, true, 300).expect("reconcile");
        assert!(matches!(outcome, ReconcileOutcome::Mismatch { .. }));

        // Local record untouched
        let row = payouts::get(&conn, failed.id).expect("get");
        assert_eq!(row.status, "failed");

        let entries = audit::recent(&conn, 20).expect("audit");
        assert!(entries.iter().any(|e| e.category == "reconciliation_mismatch"));
    }

    #[test]
    fn test_reconcile_unknown_reference() {
        let conn = test_db();
        let outcome = reconcile(&conn, "cad-999", true, 300).expect("reconcile");
        assert!(matches!(
            outcome,
            ReconcileOutcome::Mismatch {
                payout_id: None,
                ..
            }
        ));
    }
}

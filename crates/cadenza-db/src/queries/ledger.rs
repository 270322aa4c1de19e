//! Ledger account and transaction query functions.
//!
//! The account row is the only mutable ledger state; transactions are
//! append-only. Invariant: `balance == total_earned - total_paid_out` for
//! every account at rest (no in-flight payout reservation). All mutation
//! goes through the functions here; no other component writes balances.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::ledger::TransactionSource;
use cadenza_types::{TransactionId, DEFAULT_MIN_PAYOUT_CENTS};

use crate::{map_unique_violation, DbError, Result};

/// A ledger account row.
#[derive(Clone, Debug)]
pub struct AccountRow {
    pub creator_id: String,
    /// Pending unpaid balance in cents, never negative.
    pub balance: i64,
    /// Lifetime credits in cents.
    pub total_earned: i64,
    /// Lifetime confirmed payouts in cents.
    pub total_paid_out: i64,
    pub min_payout_cents: i64,
    pub created_at: u64,
}

/// A ledger transaction row.
#[derive(Clone, Debug)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub creator_id: String,
    pub amount_cents: i64,
    pub source: String,
    pub status: String,
    pub idempotency_key: String,
    pub reverses_id: Option<TransactionId>,
    pub metadata: Option<String>,
    pub created_at: u64,
}

fn require_creator_id(creator_id: &str) -> Result<()> {
    if creator_id.is_empty() {
        return Err(DbError::Validation("creator id must not be empty".into()));
    }
    Ok(())
}

/// Credit an account, creating it lazily on first credit.
///
/// Appends a transaction and increments `balance` and `total_earned` in a
/// single SQL transaction. Retrying the same `idempotency_key` for the
/// same account fails with [`DbError::Duplicate`] before any mutation;
/// callers treat that as success-no-op.
///
/// # Errors
///
/// - [`DbError::Validation`] if the amount is not positive or ids are malformed
/// - [`DbError::Duplicate`] if the idempotency key was already recorded
pub fn credit(
    conn: &Connection,
    creator_id: &str,
    amount_cents: i64,
    source: TransactionSource,
    idempotency_key: &str,
    metadata: Option<&serde_json::Value>,
    now: u64,
) -> Result<TransactionId> {
    require_creator_id(creator_id)?;
    if amount_cents <= 0 {
        return Err(DbError::Validation(format!(
            "credit amount must be positive, got {amount_cents}"
        )));
    }
    if idempotency_key.is_empty() {
        return Err(DbError::Validation("idempotency key must not be empty".into()));
    }

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT OR IGNORE INTO ledger_accounts (creator_id, min_payout_cents, created_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![creator_id, DEFAULT_MIN_PAYOUT_CENTS, now as i64],
    )?;

    tx.execute(
        "INSERT INTO ledger_transactions
             (creator_id, amount_cents, source, idempotency_key, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            creator_id,
            amount_cents,
            source.as_str(),
            idempotency_key,
            metadata.map(|m| m.to_string()),
            now as i64,
        ],
    )
    .map_err(|e| map_unique_violation(e, "idempotency key already recorded"))?;
    let tx_id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE ledger_accounts
         SET balance = balance + ?1, total_earned = total_earned + ?1
         WHERE creator_id = ?2",
        rusqlite::params![amount_cents, creator_id],
    )?;

    tx.commit()?;

    tracing::debug!(
        creator = creator_id,
        amount_cents,
        source = source.as_str(),
        tx_id,
        "ledger credit"
    );

    Ok(tx_id)
}

/// Atomically read and zero an account's balance for payout.
///
/// `total_earned` is untouched. The returned amount must be either paid
/// out (then [`mark_paid`]) or restored ([`restore_reservation`]). Fresh
/// credits arriving after this point accumulate on the zeroed balance and
/// are not conflated with the in-flight payout.
pub fn reserve_for_payout(conn: &Connection, creator_id: &str) -> Result<i64> {
    require_creator_id(creator_id)?;

    let tx = conn.unchecked_transaction()?;
    let amount: i64 = tx
        .query_row(
            "SELECT balance FROM ledger_accounts WHERE creator_id = ?1",
            [creator_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("account {creator_id}")))?;

    tx.execute(
        "UPDATE ledger_accounts SET balance = 0 WHERE creator_id = ?1",
        [creator_id],
    )?;
    tx.commit()?;

    Ok(amount)
}

/// Re-credit a reserved amount that could not be paid out.
///
/// Does not touch `total_earned`; the funds were already earned.
pub fn restore_reservation(conn: &Connection, creator_id: &str, amount_cents: i64) -> Result<()> {
    require_creator_id(creator_id)?;
    if amount_cents < 0 {
        return Err(DbError::Validation(format!(
            "restore amount must be non-negative, got {amount_cents}"
        )));
    }

    let updated = conn.execute(
        "UPDATE ledger_accounts SET balance = balance + ?1 WHERE creator_id = ?2",
        rusqlite::params![amount_cents, creator_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {creator_id}")));
    }
    Ok(())
}

/// Record a confirmed payout against lifetime totals.
pub fn mark_paid(conn: &Connection, creator_id: &str, amount_cents: i64) -> Result<()> {
    require_creator_id(creator_id)?;
    if amount_cents < 0 {
        return Err(DbError::Validation(format!(
            "paid amount must be non-negative, got {amount_cents}"
        )));
    }

    let updated = conn.execute(
        "UPDATE ledger_accounts SET total_paid_out = total_paid_out + ?1 WHERE creator_id = ?2",
        rusqlite::params![amount_cents, creator_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {creator_id}")));
    }
    Ok(())
}

/// Reverse a credited transaction.
///
/// Appends a negative-amount `fraud-reversal` transaction referencing the
/// original and flips the original's status to `reversed` — the single
/// permitted status transition; amounts are never edited. The account's
/// balance and `total_earned` are debited together so the rest invariant
/// holds.
///
/// # Errors
///
/// - [`DbError::NotFound`] if the transaction does not exist
/// - [`DbError::Duplicate`] if it was already reversed
/// - [`DbError::Constraint`] if the balance cannot absorb the reversal
///   (earnings already paid out; left for manual reconciliation)
pub fn reverse(
    conn: &Connection,
    transaction_id: TransactionId,
    idempotency_key: &str,
    now: u64,
) -> Result<TransactionId> {
    if idempotency_key.is_empty() {
        return Err(DbError::Validation("idempotency key must not be empty".into()));
    }

    let tx = conn.unchecked_transaction()?;

    let original: Option<(String, i64, String)> = tx
        .query_row(
            "SELECT creator_id, amount_cents, status FROM ledger_transactions WHERE id = ?1",
            [transaction_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (creator_id, amount_cents, status) =
        original.ok_or_else(|| DbError::NotFound(format!("transaction {transaction_id}")))?;

    if status == "reversed" {
        return Err(DbError::Duplicate(format!(
            "transaction {transaction_id} already reversed"
        )));
    }

    tx.execute(
        "INSERT INTO ledger_transactions
             (creator_id, amount_cents, source, idempotency_key, reverses_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            creator_id,
            -amount_cents,
            TransactionSource::FraudReversal.as_str(),
            idempotency_key,
            transaction_id,
            now as i64,
        ],
    )
    .map_err(|e| map_unique_violation(e, "reversal already recorded"))?;
    let reversal_id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE ledger_transactions SET status = 'reversed' WHERE id = ?1",
        [transaction_id],
    )?;

    tx.execute(
        "UPDATE ledger_accounts
         SET balance = balance - ?1, total_earned = total_earned - ?1
         WHERE creator_id = ?2",
        rusqlite::params![amount_cents, creator_id],
    )
    .map_err(|e| map_unique_violation(e, "balance cannot absorb reversal"))?;

    tx.commit()?;

    tracing::info!(
        creator = creator_id.as_str(),
        original = transaction_id,
        reversal = reversal_id,
        amount_cents,
        "transaction reversed"
    );

    Ok(reversal_id)
}

/// Fetch an account row.
pub fn account(conn: &Connection, creator_id: &str) -> Result<AccountRow> {
    conn.query_row(
        "SELECT creator_id, balance, total_earned, total_paid_out, min_payout_cents, created_at
         FROM ledger_accounts WHERE creator_id = ?1",
        [creator_id],
        |row| {
            Ok(AccountRow {
                creator_id: row.get(0)?,
                balance: row.get(1)?,
                total_earned: row.get(2)?,
                total_paid_out: row.get(3)?,
                min_payout_cents: row.get(4)?,
                created_at: row.get::<_, i64>(5)? as u64,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("account {creator_id}")))
}

/// List accounts whose balance meets their payout threshold.
pub fn accounts_above_threshold(conn: &Connection) -> Result<Vec<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT creator_id, balance, total_earned, total_paid_out, min_payout_cents, created_at
         FROM ledger_accounts WHERE balance >= min_payout_cents",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AccountRow {
                creator_id: row.get(0)?,
                balance: row.get(1)?,
                total_earned: row.get(2)?,
                total_paid_out: row.get(3)?,
                min_payout_cents: row.get(4)?,
                created_at: row.get::<_, i64>(5)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Override an account's minimum payout threshold.
pub fn set_min_payout(conn: &Connection, creator_id: &str, min_payout_cents: i64) -> Result<()> {
    if min_payout_cents < 0 {
        return Err(DbError::Validation(
            "minimum payout must be non-negative".into(),
        ));
    }
    let updated = conn.execute(
        "UPDATE ledger_accounts SET min_payout_cents = ?1 WHERE creator_id = ?2",
        rusqlite::params![min_payout_cents, creator_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {creator_id}")));
    }
    Ok(())
}

/// List an account's most recent transactions.
pub fn recent_transactions(
    conn: &Connection,
    creator_id: &str,
    limit: u32,
) -> Result<Vec<TransactionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, creator_id, amount_cents, source, status, idempotency_key,
                reverses_id, metadata, created_at
         FROM ledger_transactions WHERE creator_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![creator_id, limit], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                creator_id: row.get(1)?,
                amount_cents: row.get(2)?,
                source: row.get(3)?,
                status: row.get(4)?,
                idempotency_key: row.get(5)?,
                reverses_id: row.get(6)?,
                metadata: row.get(7)?,
                created_at: row.get::<_, i64>(8)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Count all transactions (test and reconciliation support).
pub fn transaction_count(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM ledger_transactions", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_credit_creates_account_lazily() {
        let conn = test_db();
        credit(&conn, "c1", 1_000, TransactionSource::Tip, "tip-1", None, 100).expect("credit");

        let acct = account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 1_000);
        assert_eq!(acct.total_earned, 1_000);
        assert_eq!(acct.total_paid_out, 0);
        assert_eq!(acct.min_payout_cents, DEFAULT_MIN_PAYOUT_CENTS);
    }

    #[test]
    fn test_duplicate_idempotency_key_rejected() {
        let conn = test_db();
        credit(&conn, "c1", 1_000, TransactionSource::Tip, "tip-1", None, 100).expect("first");
        let result = credit(&conn, "c1", 1_000, TransactionSource::Tip, "tip-1", None, 101);
        assert!(matches!(result, Err(DbError::Duplicate(_))));

        // Balance unchanged by the rejected retry
        assert_eq!(account(&conn, "c1").expect("account").balance, 1_000);
    }

    #[test]
    fn test_same_key_different_accounts_allowed() {
        let conn = test_db();
        credit(&conn, "c1", 100, TransactionSource::Tip, "evt-1", None, 100).expect("c1");
        credit(&conn, "c2", 200, TransactionSource::Tip, "evt-1", None, 100).expect("c2");
    }

    #[test]
    fn test_zero_or_negative_amount_rejected() {
        let conn = test_db();
        assert!(matches!(
            credit(&conn, "c1", 0, TransactionSource::Tip, "k", None, 100),
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            credit(&conn, "c1", -5, TransactionSource::Tip, "k", None, 100),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_reserve_zeroes_balance() {
        let conn = test_db();
        credit(&conn, "c1", 6_000, TransactionSource::SubscriptionShare, "d-1", None, 100)
            .expect("credit");

        let reserved = reserve_for_payout(&conn, "c1").expect("reserve");
        assert_eq!(reserved, 6_000);

        let acct = account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 0);
        assert_eq!(acct.total_earned, 6_000);
    }

    #[test]
    fn test_reserve_unknown_account() {
        let conn = test_db();
        assert!(matches!(
            reserve_for_payout(&conn, "ghost"),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_restore_reservation() {
        let conn = test_db();
        credit(&conn, "c1", 4_500, TransactionSource::Tip, "t-1", None, 100).expect("credit");
        let reserved = reserve_for_payout(&conn, "c1").expect("reserve");
        restore_reservation(&conn, "c1", reserved).expect("restore");

        let acct = account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 4_500);
        assert_eq!(acct.total_earned, 4_500);
        // Invariant intact
        assert_eq!(acct.balance, acct.total_earned - acct.total_paid_out);
    }

    #[test]
    fn test_mark_paid_updates_lifetime_totals() {
        let conn = test_db();
        credit(&conn, "c1", 6_000, TransactionSource::SubscriptionShare, "d-1", None, 100)
            .expect("credit");
        let reserved = reserve_for_payout(&conn, "c1").expect("reserve");
        mark_paid(&conn, "c1", reserved).expect("mark paid");

        let acct = account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 0);
        assert_eq!(acct.total_paid_out, 6_000);
        assert_eq!(acct.balance, acct.total_earned - acct.total_paid_out);
    }

    #[test]
    fn test_reverse_appends_and_flips_status() {
        let conn = test_db();
        let tx_id =
            credit(&conn, "c1", 2_000, TransactionSource::StreamView, "s-1", None, 100)
                .expect("credit");

        let reversal_id = reverse(&conn, tx_id, "rev-s-1", 200).expect("reverse");
        assert_ne!(reversal_id, tx_id);

        let txs = recent_transactions(&conn, "c1", 10).expect("list");
        assert_eq!(txs.len(), 2);
        let reversal = txs.iter().find(|t| t.id == reversal_id).expect("reversal row");
        assert_eq!(reversal.amount_cents, -2_000);
        assert_eq!(reversal.source, "fraud-reversal");
        assert_eq!(reversal.reverses_id, Some(tx_id));
        let original = txs.iter().find(|t| t.id == tx_id).expect("original row");
        assert_eq!(original.status, "reversed");
        assert_eq!(original.amount_cents, 2_000);

        let acct = account(&conn, "c1").expect("account");
        assert_eq!(acct.balance, 0);
        assert_eq!(acct.total_earned, 0);
    }

    #[test]
    fn test_double_reverse_rejected() {
        let conn = test_db();
        let tx_id =
            credit(&conn, "c1", 2_000, TransactionSource::StreamView, "s-1", None, 100)
                .expect("credit");
        reverse(&conn, tx_id, "rev-1", 200).expect("first reversal");
        assert!(matches!(
            reverse(&conn, tx_id, "rev-2", 201),
            Err(DbError::Duplicate(_))
        ));
    }

    #[test]
    fn test_reverse_after_payout_hits_balance_floor() {
        let conn = test_db();
        let tx_id =
            credit(&conn, "c1", 2_000, TransactionSource::StreamView, "s-1", None, 100)
                .expect("credit");
        let reserved = reserve_for_payout(&conn, "c1").expect("reserve");
        mark_paid(&conn, "c1", reserved).expect("paid");

        // Earnings are already out the door; the balance floor rejects this.
        assert!(matches!(
            reverse(&conn, tx_id, "rev-1", 300),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_accounts_above_threshold() {
        let conn = test_db();
        credit(&conn, "low", 4_500, TransactionSource::Tip, "t-1", None, 100).expect("low");
        credit(&conn, "high", 6_000, TransactionSource::Tip, "t-2", None, 100).expect("high");

        let eligible = accounts_above_threshold(&conn).expect("list");
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].creator_id, "high");
    }

    #[test]
    fn test_recent_transactions_newest_first() {
        let conn = test_db();
        credit(&conn, "c1", 100, TransactionSource::Tip, "t-1", None, 100).expect("t1");
        credit(&conn, "c1", 200, TransactionSource::Tip, "t-2", None, 200).expect("t2");

        let txs = recent_transactions(&conn, "c1", 10).expect("list");
        assert_eq!(txs[0].idempotency_key, "t-2");
        assert_eq!(txs[1].idempotency_key, "t-1");
    }

    #[test]
    fn test_metadata_round_trip() {
        let conn = test_db();
        let meta = serde_json::json!({"base_amount": 56_000, "fraud_streams": 10});
        credit(&conn, "c1", 98_000, TransactionSource::SubscriptionShare, "d-1", Some(&meta), 100)
            .expect("credit");

        let txs = recent_transactions(&conn, "c1", 1).expect("list");
        let stored: serde_json::Value =
            serde_json::from_str(txs[0].metadata.as_deref().expect("metadata"))
                .expect("parse metadata");
        assert_eq!(stored["fraud_streams"], 10);
    }
}

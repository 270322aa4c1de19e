//! Payout attempt query functions.
//!
//! One row per attempt; a completed payout is immutable and a failed one
//! is retried by inserting a new row, preserving forensic history.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::ledger::PayoutMethod;
use cadenza_types::PayoutId;

use crate::{map_unique_violation, DbError, Result};

/// A payout attempt row.
#[derive(Clone, Debug)]
pub struct PayoutRow {
    pub id: PayoutId,
    pub creator_id: String,
    pub method: String,
    pub gross_cents: i64,
    pub tax_cents: i64,
    pub net_cents: i64,
    pub status: String,
    pub external_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: u64,
    pub processed_at: Option<u64>,
}

fn row_to_payout(row: &rusqlite::Row<'_>) -> rusqlite::Result<PayoutRow> {
    Ok(PayoutRow {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        method: row.get(2)?,
        gross_cents: row.get(3)?,
        tax_cents: row.get(4)?,
        net_cents: row.get(5)?,
        status: row.get(6)?,
        external_reference: row.get(7)?,
        failure_reason: row.get(8)?,
        created_at: row.get::<_, i64>(9)? as u64,
        processed_at: row.get::<_, Option<i64>>(10)?.map(|t| t as u64),
    })
}

const PAYOUT_COLUMNS: &str = "id, creator_id, method, gross_cents, tax_cents, net_cents,
     status, external_reference, failure_reason, created_at, processed_at";

/// Insert a new pending payout attempt.
pub fn insert_attempt(
    conn: &Connection,
    creator_id: &str,
    method: PayoutMethod,
    gross_cents: i64,
    tax_cents: i64,
    net_cents: i64,
    now: u64,
) -> Result<PayoutId> {
    if gross_cents < 0 || tax_cents < 0 || net_cents < 0 || net_cents + tax_cents != gross_cents {
        return Err(DbError::Validation(format!(
            "inconsistent payout amounts: gross {gross_cents}, tax {tax_cents}, net {net_cents}"
        )));
    }
    conn.execute(
        "INSERT INTO payouts (creator_id, method, gross_cents, tax_cents, net_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            creator_id,
            method.as_str(),
            gross_cents,
            tax_cents,
            net_cents,
            now as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Mark a pending payout completed.
pub fn mark_completed(
    conn: &Connection,
    payout_id: PayoutId,
    external_reference: Option<&str>,
    processed_at: u64,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE payouts SET status = 'completed', external_reference = ?1, processed_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            rusqlite::params![external_reference, processed_at as i64, payout_id],
        )
        .map_err(|e| map_unique_violation(e, "external reference already recorded"))?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("pending payout {payout_id}")));
    }
    Ok(())
}

/// Mark a pending payout failed.
///
/// A failed attempt keeps any external reference it was issued so the
/// processor webhook can still reconcile against it.
pub fn mark_failed(
    conn: &Connection,
    payout_id: PayoutId,
    external_reference: Option<&str>,
    reason: &str,
    processed_at: u64,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE payouts
             SET status = 'failed', external_reference = ?1, failure_reason = ?2, processed_at = ?3
             WHERE id = ?4 AND status = 'pending'",
            rusqlite::params![external_reference, reason, processed_at as i64, payout_id],
        )
        .map_err(|e| map_unique_violation(e, "external reference already recorded"))?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("pending payout {payout_id}")));
    }
    Ok(())
}

/// Fetch a payout by id.
pub fn get(conn: &Connection, payout_id: PayoutId) -> Result<PayoutRow> {
    conn.query_row(
        &format!("SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = ?1"),
        [payout_id],
        |row| row_to_payout(row),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("payout {payout_id}")))
}

/// Look up a payout by its processor reference (webhook reconciliation).
pub fn find_by_external_reference(
    conn: &Connection,
    external_reference: &str,
) -> Result<Option<PayoutRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {PAYOUT_COLUMNS} FROM payouts WHERE external_reference = ?1"),
            [external_reference],
            |row| row_to_payout(row),
        )
        .optional()?;
    Ok(row)
}

/// A creator's payout history, newest first.
pub fn history(conn: &Connection, creator_id: &str, limit: u32) -> Result<Vec<PayoutRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE creator_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![creator_id, limit], |row| row_to_payout(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All pending manual-invoice payouts (operator work queue).
pub fn pending_invoices(conn: &Connection) -> Result<Vec<PayoutRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYOUT_COLUMNS} FROM payouts
         WHERE method = 'manual-invoice' AND status = 'pending'
         ORDER BY created_at"
    ))?;
    let rows = stmt
        .query_map([], |row| row_to_payout(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

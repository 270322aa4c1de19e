//! Audit log query functions.
//!
//! Append-only. Every credit, distribution, and payout step writes one
//! entry; entries are queryable and exportable for compliance, never
//! mutated.

use rusqlite::Connection;

use crate::Result;

/// An audit log entry.
#[derive(Clone, Debug)]
pub struct AuditRow {
    pub id: i64,
    pub category: String,
    pub creator_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub detail: String,
    pub created_at: u64,
}

/// Append an audit entry.
pub fn append(
    conn: &Connection,
    category: &str,
    creator_id: Option<&str>,
    amount_cents: Option<i64>,
    detail: &serde_json::Value,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_log (category, creator_id, amount_cents, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![category, creator_id, amount_cents, detail.to_string(), now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        id: row.get(0)?,
        category: row.get(1)?,
        creator_id: row.get(2)?,
        amount_cents: row.get(3)?,
        detail: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
    })
}

/// Most recent entries, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<AuditRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, category, creator_id, amount_cents, detail, created_at
         FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| row_to_audit(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Export all entries in a time range, oldest first (compliance export).
pub fn export_range(conn: &Connection, from: u64, to: u64) -> Result<Vec<AuditRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, category, creator_id, amount_cents, detail, created_at
         FROM audit_log WHERE created_at >= ?1 AND created_at < ?2 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![from as i64, to as i64], |row| row_to_audit(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

//! Treasury fund query functions.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::ledger::FundKind;
use cadenza_types::period::Period;

use crate::{DbError, Result};

/// Record a fund allocation for a period.
///
/// Returns `true` if the row was inserted, `false` if the (fund, period)
/// row already exists — re-running a distribution is a no-op.
pub fn record_allocation(
    conn: &Connection,
    fund: FundKind,
    period: Period,
    balance_cents: i64,
) -> Result<bool> {
    if balance_cents < 0 {
        return Err(DbError::Validation(format!(
            "fund allocation must be non-negative, got {balance_cents}"
        )));
    }
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO treasury_funds (fund, period_start, period_end, balance_cents)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            fund.as_str(),
            period.start as i64,
            period.end as i64,
            balance_cents,
        ],
    )?;
    Ok(inserted > 0)
}

/// Current balance of a fund for a period.
pub fn fund_balance(conn: &Connection, fund: FundKind, period: Period) -> Result<i64> {
    conn.query_row(
        "SELECT balance_cents FROM treasury_funds
         WHERE fund = ?1 AND period_start = ?2 AND period_end = ?3",
        rusqlite::params![fund.as_str(), period.start as i64, period.end as i64],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("fund {} for period {}", fund.as_str(), period.start)))
}

/// All fund balances for a period.
pub fn period_balances(conn: &Connection, period: Period) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT fund, balance_cents FROM treasury_funds
         WHERE period_start = ?1 AND period_end = ?2 ORDER BY fund",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![period.start as i64, period.end as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Record a revenue total reported by the billing service.
///
/// Idempotent per (period, source): re-delivery of the same report is
/// ignored and returns `false`.
pub fn record_revenue_report(
    conn: &Connection,
    period: Period,
    source_type: &str,
    total_revenue_cents: i64,
    now: u64,
) -> Result<bool> {
    if total_revenue_cents < 0 {
        return Err(DbError::Validation(format!(
            "revenue must be non-negative, got {total_revenue_cents}"
        )));
    }
    if source_type.is_empty() {
        return Err(DbError::Validation("source type must not be empty".into()));
    }
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO period_revenue_reports
             (period_start, period_end, source_type, total_revenue_cents, reported_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            period.start as i64,
            period.end as i64,
            source_type,
            total_revenue_cents,
            now as i64,
        ],
    )?;
    Ok(inserted > 0)
}

/// Number of revenue reports recorded for a period.
pub fn revenue_report_count(conn: &Connection, period: Period) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM period_revenue_reports
         WHERE period_start = ?1 AND period_end = ?2",
        rusqlite::params![period.start as i64, period.end as i64],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Total reported revenue for a period across all sources.
pub fn total_period_revenue(conn: &Connection, period: Period) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(total_revenue_cents), 0) FROM period_revenue_reports
         WHERE period_start = ?1 AND period_end = ?2",
        rusqlite::params![period.start as i64, period.end as i64],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Conditionally debit a fund.
///
/// Returns `Ok(true)` on success, `Ok(false)` if the fund balance is
/// insufficient (nothing is debited — never a partial execution).
pub fn try_debit_fund(
    conn: &Connection,
    fund: FundKind,
    period: Period,
    amount_cents: i64,
) -> Result<bool> {
    if amount_cents < 0 {
        return Err(DbError::Validation(format!(
            "debit amount must be non-negative, got {amount_cents}"
        )));
    }
    let updated = conn.execute(
        "UPDATE treasury_funds SET balance_cents = balance_cents - ?1
         WHERE fund = ?2 AND period_start = ?3 AND period_end = ?4 AND balance_cents >= ?1",
        rusqlite::params![
            amount_cents,
            fund.as_str(),
            period.start as i64,
            period.end as i64,
        ],
    )?;
    if updated > 0 {
        return Ok(true);
    }
    // Distinguish a missing row from an insufficient balance.
    fund_balance(conn, fund, period)?;
    Ok(false)
}

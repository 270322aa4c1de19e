//! Scheduler job run records.
//!
//! One row per (job, period) is the period-scoped idempotency record for
//! the scheduler: a succeeded run is never re-entered, a failed run may
//! be retried manually.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::period::Period;

use crate::Result;

/// A job run row.
#[derive(Clone, Debug)]
pub struct JobRunRow {
    pub job: String,
    pub period_start: u64,
    pub period_end: u64,
    pub status: String,
    pub detail: Option<String>,
    pub started_at: u64,
    pub finished_at: Option<u64>,
}

/// Outcome of attempting to claim a job run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The run was claimed; proceed.
    Claimed,
    /// A previous run already succeeded; skip.
    AlreadySucceeded,
    /// A run is currently marked running; skip.
    AlreadyRunning,
}

/// Claim the (job, period) run slot.
///
/// A failed prior run is reclaimed for retry; a succeeded one is not.
pub fn claim_run(conn: &Connection, job: &str, period: Period, now: u64) -> Result<ClaimOutcome> {
    let tx = conn.unchecked_transaction()?;

    let existing: Option<String> = tx
        .query_row(
            "SELECT status FROM job_runs WHERE job = ?1 AND period_start = ?2 AND period_end = ?3",
            rusqlite::params![job, period.start as i64, period.end as i64],
            |row| row.get(0),
        )
        .optional()?;

    let outcome = match existing.as_deref() {
        None => {
            tx.execute(
                "INSERT INTO job_runs (job, period_start, period_end, status, started_at)
                 VALUES (?1, ?2, ?3, 'running', ?4)",
                rusqlite::params![job, period.start as i64, period.end as i64, now as i64],
            )?;
            ClaimOutcome::Claimed
        }
        Some("failed") => {
            tx.execute(
                "UPDATE job_runs SET status = 'running', detail = NULL, started_at = ?1,
                        finished_at = NULL
                 WHERE job = ?2 AND period_start = ?3 AND period_end = ?4",
                rusqlite::params![now as i64, job, period.start as i64, period.end as i64],
            )?;
            ClaimOutcome::Claimed
        }
        Some("succeeded") => ClaimOutcome::AlreadySucceeded,
        Some(_) => ClaimOutcome::AlreadyRunning,
    };

    tx.commit()?;
    Ok(outcome)
}

/// Record the terminal state of a claimed run.
pub fn finish_run(
    conn: &Connection,
    job: &str,
    period: Period,
    succeeded: bool,
    detail: &serde_json::Value,
    now: u64,
) -> Result<()> {
    conn.execute(
        "UPDATE job_runs SET status = ?1, detail = ?2, finished_at = ?3
         WHERE job = ?4 AND period_start = ?5 AND period_end = ?6",
        rusqlite::params![
            if succeeded { "succeeded" } else { "failed" },
            detail.to_string(),
            now as i64,
            job,
            period.start as i64,
            period.end as i64,
        ],
    )?;
    Ok(())
}

/// Fetch a run record.
pub fn get_run(conn: &Connection, job: &str, period: Period) -> Result<Option<JobRunRow>> {
    let row = conn
        .query_row(
            "SELECT job, period_start, period_end, status, detail, started_at, finished_at
             FROM job_runs WHERE job = ?1 AND period_start = ?2 AND period_end = ?3",
            rusqlite::params![job, period.start as i64, period.end as i64],
            |row| {
                Ok(JobRunRow {
                    job: row.get(0)?,
                    period_start: row.get::<_, i64>(1)? as u64,
                    period_end: row.get::<_, i64>(2)? as u64,
                    status: row.get(3)?,
                    detail: row.get(4)?,
                    started_at: row.get::<_, i64>(5)? as u64,
                    finished_at: row.get::<_, Option<i64>>(6)?.map(|t| t as u64),
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Most recent runs across all jobs, newest first.
pub fn recent_runs(conn: &Connection, limit: u32) -> Result<Vec<JobRunRow>> {
    let mut stmt = conn.prepare(
        "SELECT job, period_start, period_end, status, detail, started_at, finished_at
         FROM job_runs ORDER BY started_at DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(JobRunRow {
                job: row.get(0)?,
                period_start: row.get::<_, i64>(1)? as u64,
                period_end: row.get::<_, i64>(2)? as u64,
                status: row.get(3)?,
                detail: row.get(4)?,
                started_at: row.get::<_, i64>(5)? as u64,
                finished_at: row.get::<_, Option<i64>>(6)?.map(|t| t as u64),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

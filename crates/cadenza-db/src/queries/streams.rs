//! Period stream statistic queries.
//!
//! Stream-event batches are aggregated by the daemon and accumulated here
//! per (creator, period). Accumulation is additive, so batches may arrive
//! in any order from any number of ingestion workers.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::period::Period;

use crate::{DbError, Result};

/// Accumulated stream counts for one creator in one period.
#[derive(Clone, Debug)]
pub struct StatsRow {
    pub creator_id: String,
    pub qualified_streams: i64,
    pub fraud_streams: i64,
}

/// Add a batch's counts to the stored totals for the period.
pub fn accumulate(
    conn: &Connection,
    creator_id: &str,
    period: Period,
    qualified_streams: i64,
    fraud_streams: i64,
) -> Result<()> {
    if qualified_streams < 0 || fraud_streams < 0 || fraud_streams > qualified_streams {
        return Err(DbError::Validation(format!(
            "invalid stream counts: qualified {qualified_streams}, fraud {fraud_streams}"
        )));
    }
    conn.execute(
        "INSERT INTO period_stream_stats
             (creator_id, period_start, period_end, qualified_streams, fraud_streams)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(creator_id, period_start, period_end) DO UPDATE SET
             qualified_streams = qualified_streams + excluded.qualified_streams,
             fraud_streams = fraud_streams + excluded.fraud_streams",
        rusqlite::params![
            creator_id,
            period.start as i64,
            period.end as i64,
            qualified_streams,
            fraud_streams,
        ],
    )?;
    Ok(())
}

/// All creators with at least one qualified stream in the period.
pub fn stats_for_period(conn: &Connection, period: Period) -> Result<Vec<StatsRow>> {
    let mut stmt = conn.prepare(
        "SELECT creator_id, qualified_streams, fraud_streams
         FROM period_stream_stats
         WHERE period_start = ?1 AND period_end = ?2 AND qualified_streams > 0
         ORDER BY creator_id",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![period.start as i64, period.end as i64],
            |row| {
                Ok(StatsRow {
                    creator_id: row.get(0)?,
                    qualified_streams: row.get(1)?,
                    fraud_streams: row.get(2)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One creator's counts for the period, if any.
pub fn creator_stats(
    conn: &Connection,
    creator_id: &str,
    period: Period,
) -> Result<Option<StatsRow>> {
    let row = conn
        .query_row(
            "SELECT creator_id, qualified_streams, fraud_streams
             FROM period_stream_stats
             WHERE creator_id = ?1 AND period_start = ?2 AND period_end = ?3",
            rusqlite::params![creator_id, period.start as i64, period.end as i64],
            |row| {
                Ok(StatsRow {
                    creator_id: row.get(0)?,
                    qualified_streams: row.get(1)?,
                    fraud_streams: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Platform-wide qualified stream total for the period.
pub fn platform_qualified_total(conn: &Connection, period: Period) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(qualified_streams), 0) FROM period_stream_stats
         WHERE period_start = ?1 AND period_end = ?2",
        rusqlite::params![period.start as i64, period.end as i64],
        |row| row.get(0),
    )?;
    Ok(total)
}

//! Creator tier, priority designation, and catalog metric queries.
//!
//! Auto-promotion never touches a designation pinned by a manual
//! override; the `WHERE manual_override = 0` guard enforces that at the
//! storage layer.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::tier::CreatorTier;

use crate::{DbError, Result};

/// A priority designation row.
#[derive(Clone, Debug)]
pub struct DesignationRow {
    pub creator_id: String,
    pub priority_level: i64,
    pub active: bool,
    pub auto_promoted: bool,
    pub manual_override: bool,
    pub updated_at: u64,
}

/// Catalog metrics for a creator, fed by the storefront service.
#[derive(Clone, Debug)]
pub struct MetricsRow {
    pub creator_id: String,
    pub upload_count: i64,
    pub quality_score: f64,
    pub updated_at: u64,
}

/// Set a creator's tier.
pub fn set_tier(conn: &Connection, creator_id: &str, tier: CreatorTier, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO creator_tiers (creator_id, tier, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(creator_id) DO UPDATE SET tier = excluded.tier, updated_at = excluded.updated_at",
        rusqlite::params![creator_id, tier.as_str(), now as i64],
    )?;
    Ok(())
}

/// A creator's tier, defaulting to emerging when never set.
pub fn tier(conn: &Connection, creator_id: &str) -> Result<CreatorTier> {
    let code: Option<String> = conn
        .query_row(
            "SELECT tier FROM creator_tiers WHERE creator_id = ?1",
            [creator_id],
            |row| row.get(0),
        )
        .optional()?;
    match code {
        Some(code) => {
            CreatorTier::from_str(&code).map_err(|e| DbError::Serialization(e.to_string()))
        }
        None => Ok(CreatorTier::default()),
    }
}

/// Apply an automatic promotion/demotion decision.
///
/// Returns `false` without changing anything if the designation is pinned
/// by a manual override.
pub fn set_auto_designation(
    conn: &Connection,
    creator_id: &str,
    active: bool,
    priority_level: i64,
    now: u64,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO priority_designations
             (creator_id, priority_level, active, auto_promoted, manual_override, updated_at)
         VALUES (?1, ?2, ?3, 1, 0, ?4)
         ON CONFLICT(creator_id) DO UPDATE SET
             priority_level = excluded.priority_level,
             active = excluded.active,
             auto_promoted = 1,
             updated_at = excluded.updated_at
         WHERE priority_designations.manual_override = 0",
        rusqlite::params![creator_id, priority_level, active, now as i64],
    )?;
    Ok(changed > 0)
}

/// Explicit operator override; pins the designation against auto changes.
pub fn set_manual_designation(
    conn: &Connection,
    creator_id: &str,
    active: bool,
    priority_level: i64,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO priority_designations
             (creator_id, priority_level, active, auto_promoted, manual_override, updated_at)
         VALUES (?1, ?2, ?3, 0, 1, ?4)
         ON CONFLICT(creator_id) DO UPDATE SET
             priority_level = excluded.priority_level,
             active = excluded.active,
             auto_promoted = 0,
             manual_override = 1,
             updated_at = excluded.updated_at",
        rusqlite::params![creator_id, priority_level, active, now as i64],
    )?;
    Ok(())
}

/// Release a manual override so auto-evaluation applies again.
pub fn clear_manual_override(conn: &Connection, creator_id: &str, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE priority_designations SET manual_override = 0, updated_at = ?1
         WHERE creator_id = ?2",
        rusqlite::params![now as i64, creator_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("designation {creator_id}")));
    }
    Ok(())
}

/// Fetch a designation.
pub fn designation(conn: &Connection, creator_id: &str) -> Result<Option<DesignationRow>> {
    let row = conn
        .query_row(
            "SELECT creator_id, priority_level, active, auto_promoted, manual_override, updated_at
             FROM priority_designations WHERE creator_id = ?1",
            [creator_id],
            |row| {
                Ok(DesignationRow {
                    creator_id: row.get(0)?,
                    priority_level: row.get(1)?,
                    active: row.get(2)?,
                    auto_promoted: row.get(3)?,
                    manual_override: row.get(4)?,
                    updated_at: row.get::<_, i64>(5)? as u64,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Creators with an active priority designation.
pub fn active_priority_creators(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT creator_id FROM priority_designations WHERE active = 1 ORDER BY creator_id",
    )?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Upsert catalog metrics for a creator.
pub fn upsert_metrics(
    conn: &Connection,
    creator_id: &str,
    upload_count: i64,
    quality_score: f64,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO creator_metrics (creator_id, upload_count, quality_score, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(creator_id) DO UPDATE SET
             upload_count = excluded.upload_count,
             quality_score = excluded.quality_score,
             updated_at = excluded.updated_at",
        rusqlite::params![creator_id, upload_count, quality_score, now as i64],
    )?;
    Ok(())
}

/// All creator metrics (promotion evaluation input).
pub fn all_metrics(conn: &Connection) -> Result<Vec<MetricsRow>> {
    let mut stmt = conn.prepare(
        "SELECT creator_id, upload_count, quality_score, updated_at
         FROM creator_metrics ORDER BY creator_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MetricsRow {
                creator_id: row.get(0)?,
                upload_count: row.get(1)?,
                quality_score: row.get(2)?,
                updated_at: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

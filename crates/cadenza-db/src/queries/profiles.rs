//! Creator payout profile queries.

use rusqlite::{Connection, OptionalExtension};

use cadenza_types::country::Country;
use cadenza_types::events::PayoutProfile;

use crate::Result;

/// Store or replace a creator's payout profile.
pub fn upsert(conn: &Connection, creator_id: &str, profile: &PayoutProfile, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO creator_payout_profiles
             (creator_id, connect_account_id, bank_iban, crypto_wallet, crypto_asset_type,
              country, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(creator_id) DO UPDATE SET
             connect_account_id = excluded.connect_account_id,
             bank_iban = excluded.bank_iban,
             crypto_wallet = excluded.crypto_wallet,
             crypto_asset_type = excluded.crypto_asset_type,
             country = excluded.country,
             updated_at = excluded.updated_at",
        rusqlite::params![
            creator_id,
            profile.connect_account_id,
            profile.bank_iban,
            profile.crypto_wallet,
            profile.crypto_asset_type,
            profile.country.as_code(),
            now as i64,
        ],
    )?;
    Ok(())
}

/// Fetch a creator's payout profile.
pub fn get(conn: &Connection, creator_id: &str) -> Result<Option<PayoutProfile>> {
    let row = conn
        .query_row(
            "SELECT connect_account_id, bank_iban, crypto_wallet, crypto_asset_type, country
             FROM creator_payout_profiles WHERE creator_id = ?1",
            [creator_id],
            |row| {
                Ok(PayoutProfile {
                    connect_account_id: row.get(0)?,
                    bank_iban: row.get(1)?,
                    crypto_wallet: row.get(2)?,
                    crypto_asset_type: row.get(3)?,
                    country: Country::from_code(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()?;
    Ok(row)
}

//! Versioned schema migrations.
//!
//! The applied version is tracked in `PRAGMA user_version`. Each migration
//! runs in its own transaction together with the version bump, so a failed
//! step leaves the store at the previous version.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;

/// Ordered migrations; index + 1 is the schema version.
const MIGRATIONS: &[&str] = &[
    // 1: orders and license keys
    "
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        order_code TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'paid', 'cancelled')),
        amount INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        paid_at TEXT,
        issued_key TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);

    CREATE TABLE IF NOT EXISTS license_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        license_key TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        order_id INTEGER NOT NULL UNIQUE REFERENCES orders(id),
        status TEXT NOT NULL DEFAULT 'unused'
            CHECK (status IN ('unused', 'activated')),
        created_at TEXT NOT NULL,
        activated_at TEXT,
        device_hash TEXT
    );
    ",
    // 2: gameplay reports, devices, warnings, bans
    "
    CREATE TABLE IF NOT EXISTS account_reports (
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        wins_total INTEGER NOT NULL DEFAULT 0,
        losses_total INTEGER NOT NULL DEFAULT 0,
        has_won INTEGER NOT NULL DEFAULT 0,
        first_win_at TEXT,
        achievements_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(email, username)
    );

    CREATE TABLE IF NOT EXISTS account_achievements (
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        achievement_key TEXT NOT NULL,
        unlocked_at TEXT NOT NULL,
        UNIQUE(email, username, achievement_key)
    );

    CREATE TABLE IF NOT EXISTS account_devices (
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        device_id TEXT NOT NULL,
        first_seen_at TEXT NOT NULL,
        UNIQUE(email, username, device_id)
    );

    CREATE INDEX IF NOT EXISTS idx_account_devices_device ON account_devices(device_id);

    CREATE TABLE IF NOT EXISTS account_warnings (
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        is_warned INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        UNIQUE(email, username)
    );

    CREATE TABLE IF NOT EXISTS device_bans (
        device_id TEXT PRIMARY KEY NOT NULL,
        is_banned INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    );
    ",
    // 3: cloud saves
    "
    CREATE TABLE IF NOT EXISTS cloud_saves (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        save_json TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(email, username)
    );
    ",
    // 4: approval claim, set while the license email is in flight
    "
    ALTER TABLE orders ADD COLUMN claimed_at TEXT;
    ",
];

/// Latest schema version this build knows about.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Returns the schema version recorded in the database.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Applies every migration newer than the recorded version.
pub fn migrate(conn: &mut Connection) -> DbResult<()> {
    let found = current_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let version = idx as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| DbError::Migration {
            version,
            reason: e.to_string(),
        })?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::debug!("Applied schema migration {}", version);
    }

    if found < SCHEMA_VERSION {
        tracing::info!("Schema migrated from version {} to {}", found, SCHEMA_VERSION);
    }
    Ok(())
}

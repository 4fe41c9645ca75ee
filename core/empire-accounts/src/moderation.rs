//! Device bans and account warnings.

use crate::error::{AccountError, AccountResult};
use chrono::{DateTime, Utc};
use empire_db::Db;
use empire_types::{required, AccountRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_SEARCH_LIMIT: usize = 200;
const MAX_SEARCH_LIMIT: usize = 1000;

/// Moderation state as seen by one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// The device is banned.
    pub is_banned: bool,
    /// The account carries an unacknowledged warning.
    pub is_warned: bool,
}

/// One account/device pair, as listed by [`ModerationService::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub email: String,
    pub username: String,
    pub device_id: String,
    pub is_warned: bool,
    pub is_banned: bool,
    pub first_seen_at: DateTime<Utc>,
}

/// Warns accounts and bans devices.
#[derive(Clone)]
pub struct ModerationService {
    db: Db,
}

impl ModerationService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Warns every account ever seen on `device_id`.
    ///
    /// Returns the number of accounts flagged; an unknown device flags
    /// nothing and returns 0. The flags are written all or nothing.
    pub async fn warn_device(&self, device_id: &str) -> AccountResult<usize> {
        let device_id = required(Some(device_id), "deviceId")?.to_string();

        let affected = self
            .db
            .transaction(|tx| -> AccountResult<Vec<(String, String)>> {
                let accounts = accounts_on_device(tx, &device_id)?;
                let now = Utc::now();
                for (email, username) in &accounts {
                    set_warning(tx, email, username, true, now)?;
                }
                Ok(accounts)
            })
            .await?;

        if affected.is_empty() {
            debug!("Warn on unseen device {}: no accounts", device_id);
        } else {
            warn!("Device {} warned, {} account(s) flagged", device_id, affected.len());
        }
        Ok(affected.len())
    }

    /// Clears the warning on one account. Idempotent.
    pub async fn clear_warn(&self, account: &AccountRef) -> AccountResult<()> {
        self.write_warning(account, false).await?;
        info!("Warning cleared for {}", account);
        Ok(())
    }

    /// Player acknowledgement of a warning; same effect as [`Self::clear_warn`].
    pub async fn ack_warning(&self, account: &AccountRef) -> AccountResult<()> {
        self.write_warning(account, false).await?;
        info!("Warning acknowledged by {}", account);
        Ok(())
    }

    /// Bans or unbans a device.
    pub async fn set_ban(&self, device_id: &str, is_banned: bool) -> AccountResult<()> {
        let device_id = required(Some(device_id), "deviceId")?.to_string();

        self.db
            .transaction(|tx| -> AccountResult<()> {
                tx.execute(
                    "INSERT INTO device_bans (device_id, is_banned, updated_at) \
                     VALUES (?1, ?2, ?3) \
                     ON CONFLICT(device_id) DO UPDATE SET \
                         is_banned = excluded.is_banned, updated_at = excluded.updated_at",
                    params![device_id, is_banned, Utc::now()],
                )?;
                Ok(())
            })
            .await?;

        if is_banned {
            warn!("Device {} banned", device_id);
        } else {
            info!("Device {} unbanned", device_id);
        }
        Ok(())
    }

    /// Returns the ban flag of `device_id` and the warning flag of
    /// `account`. Missing rows read as `false`.
    pub async fn device_status(
        &self,
        account: &AccountRef,
        device_id: &str,
    ) -> AccountResult<DeviceStatus> {
        let device_id = required(Some(device_id), "deviceId")?.to_string();

        self.db
            .read(|conn| -> AccountResult<DeviceStatus> {
                let is_banned = conn
                    .query_row(
                        "SELECT is_banned FROM device_bans WHERE device_id = ?1",
                        [&device_id],
                        |row| row.get::<_, bool>(0),
                    )
                    .optional()?
                    .unwrap_or(false);
                let is_warned = conn
                    .query_row(
                        "SELECT is_warned FROM account_warnings \
                         WHERE email = ?1 AND username = ?2",
                        params![account.email(), account.username()],
                        |row| row.get::<_, bool>(0),
                    )
                    .optional()?
                    .unwrap_or(false);
                Ok(DeviceStatus {
                    is_banned,
                    is_warned,
                })
            })
            .await
    }

    /// Lists account/device pairs whose email, username or device id
    /// contains `query` (case-insensitive), most recently seen first.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> AccountResult<Vec<DeviceRecord>> {
        let query = query.trim().to_lowercase();
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT) as i64;

        self.db
            .read(|conn| -> AccountResult<Vec<DeviceRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT d.email, d.username, d.device_id, \
                            COALESCE(w.is_warned, 0), COALESCE(b.is_banned, 0), d.first_seen_at \
                     FROM account_devices d \
                     LEFT JOIN account_warnings w \
                         ON w.email = d.email AND w.username = d.username \
                     LEFT JOIN device_bans b ON b.device_id = d.device_id \
                     WHERE ?1 = '' \
                        OR instr(lower(d.email), ?1) > 0 \
                        OR instr(lower(d.username), ?1) > 0 \
                        OR instr(lower(d.device_id), ?1) > 0 \
                     ORDER BY d.first_seen_at DESC, d.rowid DESC \
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![query, limit], |row| {
                    Ok(DeviceRecord {
                        email: row.get(0)?,
                        username: row.get(1)?,
                        device_id: row.get(2)?,
                        is_warned: row.get(3)?,
                        is_banned: row.get(4)?,
                        first_seen_at: row.get(5)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    async fn write_warning(&self, account: &AccountRef, is_warned: bool) -> AccountResult<()> {
        self.db
            .transaction(|tx| {
                set_warning(tx, account.email(), account.username(), is_warned, Utc::now())
                    .map_err(AccountError::from)
            })
            .await
    }
}

/// Accounts recorded on a device, as stored (already normalized on write).
fn accounts_on_device(
    conn: &Connection,
    device_id: &str,
) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT email, username FROM account_devices \
         WHERE device_id = ?1 ORDER BY email, username",
    )?;
    let rows = stmt.query_map([device_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

fn set_warning(
    conn: &Connection,
    email: &str,
    username: &str,
    is_warned: bool,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO account_warnings (email, username, is_warned, updated_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(email, username) DO UPDATE SET \
             is_warned = excluded.is_warned, updated_at = excluded.updated_at",
        params![email, username, is_warned, now],
    )?;
    Ok(())
}

//! Per-account gameplay counters.
//!
//! Every event runs in one unit: the report row and the device link are
//! created if absent, then the event's own mutation is applied. All writes
//! are insert-or-ignore or in-place increments, so concurrent reporters
//! never lose an update.

use crate::error::{AccountError, AccountResult};
use chrono::{DateTime, Utc};
use empire_db::Db;
use empire_types::{required, AccountRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A gameplay event reported by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Register,
    Win,
    Lose,
    Achievement(String),
}

impl ReportEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Achievement(_) => "achievement",
        }
    }
}

/// Counters for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub email: String,
    pub username: String,
    pub wins_total: i64,
    pub losses_total: i64,
    pub has_won: bool,
    pub first_win_at: Option<DateTime<Utc>>,
    pub achievements_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub achievement_key: String,
    pub unlocked_at: DateTime<Utc>,
}

const REPORT_COLUMNS: &str = "email, username, wins_total, losses_total, has_won, \
     first_win_at, achievements_count, created_at, updated_at";

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<AccountReport> {
    Ok(AccountReport {
        email: row.get(0)?,
        username: row.get(1)?,
        wins_total: row.get(2)?,
        losses_total: row.get(3)?,
        has_won: row.get(4)?,
        first_win_at: row.get(5)?,
        achievements_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn find_report(conn: &Connection, account: &AccountRef) -> rusqlite::Result<Option<AccountReport>> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM account_reports WHERE email = ?1 AND username = ?2"),
        params![account.email(), account.username()],
        report_from_row,
    )
    .optional()
}

/// Applies gameplay events to account counters.
#[derive(Clone)]
pub struct ReportAggregator {
    db: Db,
}

impl ReportAggregator {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Records `event` for `account`, reported from `device_id`.
    ///
    /// Returns the counters after the event. Reporting an achievement that
    /// is already unlocked changes nothing but the device history.
    ///
    /// # Errors
    ///
    /// `missing_device_id` / `missing_achievement_key` for blank inputs, or a
    /// store error.
    pub async fn record(
        &self,
        account: &AccountRef,
        device_id: &str,
        event: ReportEvent,
    ) -> AccountResult<AccountReport> {
        let device_id = required(Some(device_id), "deviceId")?.to_string();
        let event = match event {
            ReportEvent::Achievement(key) => {
                ReportEvent::Achievement(required(Some(key.as_str()), "achievementKey")?.to_string())
            }
            other => other,
        };

        let report = self
            .db
            .transaction(|tx| -> AccountResult<AccountReport> {
                let now = Utc::now();
                tx.execute(
                    "INSERT OR IGNORE INTO account_reports \
                     (email, username, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    params![account.email(), account.username(), now],
                )?;
                let new_device = tx.execute(
                    "INSERT OR IGNORE INTO account_devices \
                     (email, username, device_id, first_seen_at) VALUES (?1, ?2, ?3, ?4)",
                    params![account.email(), account.username(), device_id, now],
                )?;
                if new_device > 0 {
                    debug!("Device {} first seen for {}", device_id, account);
                }

                apply_event(tx, account, &event, now)?;

                find_report(tx, account)?
                    .ok_or_else(|| AccountError::from(rusqlite::Error::QueryReturnedNoRows))
            })
            .await?;

        info!("Report {} for {} from device {}", event.name(), account, device_id);
        Ok(report)
    }

    /// Returns the counters for `account`, if it has reported anything.
    pub async fn report(&self, account: &AccountRef) -> AccountResult<Option<AccountReport>> {
        self.db
            .read(|conn| find_report(conn, account).map_err(AccountError::from))
            .await
    }

    /// Lists the achievements `account` has unlocked, oldest first.
    pub async fn achievements(&self, account: &AccountRef) -> AccountResult<Vec<Achievement>> {
        self.db
            .read(|conn| -> AccountResult<Vec<Achievement>> {
                let mut stmt = conn.prepare(
                    "SELECT achievement_key, unlocked_at FROM account_achievements \
                     WHERE email = ?1 AND username = ?2 \
                     ORDER BY unlocked_at ASC, achievement_key ASC",
                )?;
                let rows = stmt.query_map(params![account.email(), account.username()], |row| {
                    Ok(Achievement {
                        achievement_key: row.get(0)?,
                        unlocked_at: row.get(1)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }
}

fn apply_event(
    conn: &Connection,
    account: &AccountRef,
    event: &ReportEvent,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    match event {
        ReportEvent::Register => {}
        ReportEvent::Win => {
            conn.execute(
                "UPDATE account_reports SET \
                     wins_total = wins_total + 1, \
                     has_won = 1, \
                     first_win_at = CASE \
                         WHEN first_win_at IS NULL OR first_win_at > ?3 THEN ?3 \
                         ELSE first_win_at END, \
                     updated_at = ?3 \
                 WHERE email = ?1 AND username = ?2",
                params![account.email(), account.username(), now],
            )?;
        }
        ReportEvent::Lose => {
            conn.execute(
                "UPDATE account_reports SET losses_total = losses_total + 1, updated_at = ?3 \
                 WHERE email = ?1 AND username = ?2",
                params![account.email(), account.username(), now],
            )?;
        }
        ReportEvent::Achievement(key) => {
            let added = conn.execute(
                "INSERT OR IGNORE INTO account_achievements \
                 (email, username, achievement_key, unlocked_at) VALUES (?1, ?2, ?3, ?4)",
                params![account.email(), account.username(), key, now],
            )?;
            if added > 0 {
                conn.execute(
                    "UPDATE account_reports SET \
                         achievements_count = achievements_count + 1, updated_at = ?3 \
                     WHERE email = ?1 AND username = ?2",
                    params![account.email(), account.username(), now],
                )?;
            } else {
                debug!("Achievement {} already unlocked for {}", key, account);
            }
        }
    }
    Ok(())
}

//! Cloud saves: one opaque JSON blob per player account.
//!
//! The game client uploads its save after each session and pulls it on a new
//! device. Saves are keyed by [`AccountRef`]; the blob itself is never
//! inspected.

mod error;

pub use error::{SaveError, SaveResult};

use chrono::{DateTime, Utc};
use empire_db::Db;
use empire_types::{normalize_email, required, AccountRef};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Receipt for an uploaded save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

/// A stored save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSave {
    pub email: String,
    pub username: String,
    pub save_json: String,
    pub updated_at: DateTime<Utc>,
}

/// One save of an email, without its blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEntry {
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-email summary for the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub email: String,
    pub save_count: i64,
    pub last_updated_at: DateTime<Utc>,
}

/// Cloud save storage.
#[derive(Clone)]
pub struct SaveStore {
    db: Db,
}

impl SaveStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Stores `save_json` for `account`, replacing any previous save.
    pub async fn sync(&self, account: &AccountRef, save_json: &str) -> SaveResult<SaveReceipt> {
        let save_json = required(Some(save_json), "saveJson")?;

        let receipt = self
            .db
            .transaction(|tx| -> SaveResult<SaveReceipt> {
                let now = Utc::now();
                let id = tx.query_row(
                    "INSERT INTO cloud_saves (email, username, save_json, updated_at) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(email, username) DO UPDATE SET \
                         save_json = excluded.save_json, updated_at = excluded.updated_at \
                     RETURNING id",
                    params![account.email(), account.username(), save_json, now],
                    |row| row.get(0),
                )?;
                Ok(SaveReceipt {
                    id,
                    email: account.email().to_string(),
                    username: account.username().to_string(),
                    updated_at: now,
                })
            })
            .await?;

        debug!("Save synced for {} ({} bytes)", account, save_json.len());
        Ok(receipt)
    }

    /// Returns the save of `account`.
    ///
    /// # Errors
    ///
    /// [`SaveError::NotFound`] when the account has no save.
    pub async fn fetch(&self, account: &AccountRef) -> SaveResult<CloudSave> {
        let save = self
            .db
            .read(|conn| {
                conn.query_row(
                    "SELECT email, username, save_json, updated_at FROM cloud_saves \
                     WHERE email = ?1 AND username = ?2",
                    params![account.email(), account.username()],
                    |row| {
                        Ok(CloudSave {
                            email: row.get(0)?,
                            username: row.get(1)?,
                            save_json: row.get(2)?,
                            updated_at: row.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(SaveError::from)
            })
            .await?;

        save.ok_or_else(|| SaveError::NotFound(account.to_string()))
    }

    /// Lists the saves of `email`, most recently updated first.
    pub async fn list_by_email(&self, email: &str) -> SaveResult<Vec<SaveEntry>> {
        let email = normalize_email(required(Some(email), "email")?);

        self.db
            .read(|conn| -> SaveResult<Vec<SaveEntry>> {
                let mut stmt = conn.prepare(
                    "SELECT username, updated_at FROM cloud_saves \
                     WHERE email = ?1 ORDER BY updated_at DESC, id DESC",
                )?;
                let rows = stmt.query_map([&email], |row| {
                    Ok(SaveEntry {
                        username: row.get(0)?,
                        updated_at: row.get(1)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Lists every email with at least one save, most recent activity first.
    pub async fn list_emails(&self) -> SaveResult<Vec<EmailSummary>> {
        self.db
            .read(|conn| -> SaveResult<Vec<EmailSummary>> {
                let mut stmt = conn.prepare(
                    "SELECT email, COUNT(*), MAX(updated_at) FROM cloud_saves \
                     GROUP BY email ORDER BY MAX(updated_at) DESC, email ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(EmailSummary {
                        email: row.get(0)?,
                        save_count: row.get(1)?,
                        last_updated_at: row.get(2)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Deletes the save of `account`.
    ///
    /// # Errors
    ///
    /// [`SaveError::NotFound`] when there was nothing to delete.
    pub async fn delete(&self, account: &AccountRef) -> SaveResult<()> {
        let deleted = self
            .db
            .transaction(|tx| {
                tx.execute(
                    "DELETE FROM cloud_saves WHERE email = ?1 AND username = ?2",
                    params![account.email(), account.username()],
                )
                .map_err(SaveError::from)
            })
            .await?;

        if deleted == 0 {
            return Err(SaveError::NotFound(account.to_string()));
        }
        info!("Save deleted for {}", account);
        Ok(())
    }

    /// Deletes every save of `email` and returns how many were removed.
    pub async fn delete_all_for_email(&self, email: &str) -> SaveResult<usize> {
        let email = normalize_email(required(Some(email), "email")?);

        let deleted = self
            .db
            .transaction(|tx| {
                tx.execute("DELETE FROM cloud_saves WHERE email = ?1", [&email])
                    .map_err(SaveError::from)
            })
            .await?;

        warn!("Deleted {} save(s) for {}", deleted, email);
        Ok(deleted)
    }
}

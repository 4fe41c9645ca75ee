//! One-time license key activation.

use crate::error::LicenseResult;
use crate::keygen::normalize_key;
use crate::order::{find_key, order_is_paid, KeyStatus};
use chrono::{DateTime, Utc};
use empire_db::Db;
use empire_types::required;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Why an activation attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationReason {
    NotFound,
    AlreadyActivated,
}

impl ActivationReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyActivated => "already_activated",
        }
    }
}

/// Outcome of [`Activator::activate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ActivationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl ActivationResult {
    fn activated(at: DateTime<Utc>) -> Self {
        Self {
            valid: true,
            reason: None,
            activated_at: Some(at),
        }
    }

    fn refused(reason: ActivationReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            activated_at: None,
        }
    }
}

/// Consumes license keys.
#[derive(Clone)]
pub struct Activator {
    db: Db,
}

impl Activator {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Activates `key`, binding it to `device_hash` when one is given.
    ///
    /// Unknown and already-activated keys are not errors; they come back as
    /// `valid: false` with a reason. Of any number of concurrent calls for
    /// one key, exactly one sees `valid: true`.
    ///
    /// # Errors
    ///
    /// `missing_key` for a blank key, or a store error.
    pub async fn activate(
        &self,
        key: &str,
        device_hash: Option<&str>,
    ) -> LicenseResult<ActivationResult> {
        let key = normalize_key(required(Some(key), "key")?);
        let device_hash = device_hash
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);

        let result = self
            .db
            .transaction(|tx| -> LicenseResult<ActivationResult> {
                // a key whose order is not paid yet has not been delivered
                let record = match find_key(tx, &key)? {
                    Some(record) if order_is_paid(tx, record.order_id)? => record,
                    _ => return Ok(ActivationResult::refused(ActivationReason::NotFound)),
                };
                if record.is_activated() {
                    return Ok(ActivationResult::refused(ActivationReason::AlreadyActivated));
                }

                let now = Utc::now();
                let updated = tx.execute(
                    "UPDATE license_keys \
                     SET status = ?2, activated_at = ?3, device_hash = COALESCE(?4, device_hash) \
                     WHERE id = ?1 AND status = ?5",
                    params![
                        record.id,
                        KeyStatus::Activated,
                        now,
                        device_hash,
                        KeyStatus::Unused
                    ],
                )?;
                if updated == 0 {
                    return Ok(ActivationResult::refused(ActivationReason::AlreadyActivated));
                }
                Ok(ActivationResult::activated(now))
            })
            .await?;

        match result.reason {
            None => info!("License key {} activated", key),
            Some(reason) => debug!("Activation of {} refused: {}", key, reason.as_str()),
        }
        Ok(result)
    }
}

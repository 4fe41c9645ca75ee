//! Order approval: key issuance, persistence and delivery.
//!
//! Approval runs as two short units around the email send, so the store is
//! never locked while the mail provider is being waited on:
//!
//! 1. **claim**: load the order under exclusive intent, pick its key (the
//!    key row an earlier attempt left, the order's recorded key, or a fresh
//!    unique one), write the key row and stamp `claimed_at`
//! 2. mail the key to the buyer, bounded by a timeout, with no lock held
//! 3. **settle**: mark the order paid, or on mail failure release the claim
//!    and delete the key row this attempt wrote
//!
//! A claimed order is pending but owned: a second approval gets
//! [`LicenseError::ApprovalInProgress`], cancellation is refused and the
//! key cannot be activated. A claim older than twice the mail timeout
//! belongs to an approval that died mid-delivery and is taken over.
//!
//! After a failed approval the store is as it was before the call, so a
//! paid order always has a delivered key and approval can be retried.

use crate::error::{LicenseError, LicenseResult};
use crate::keygen::KeyGenerator;
use crate::order::{find_key_for_order, find_order, KeyStatus, Order, OrderStatus};
use chrono::{DateTime, Utc};
use empire_db::Db;
use empire_mail::{license_key_email, EmailSender};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Candidate keys tried before giving up.
pub const MAX_KEY_ATTEMPTS: usize = 10;

/// Default bound on the email send.
pub const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of an approval that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApproveOutcome {
    /// The key was persisted, mailed and the order marked paid.
    #[serde(rename_all = "camelCase")]
    Issued {
        order_id: i64,
        issued_key: String,
        email: String,
    },
    /// The order was no longer pending; nothing changed.
    #[serde(rename_all = "camelCase")]
    NotPending {
        order_id: i64,
        status: OrderStatus,
        issued_key: Option<String>,
    },
}

impl ApproveOutcome {
    /// Key attached to the order after the call, if any.
    #[must_use]
    pub fn issued_key(&self) -> Option<&str> {
        match self {
            Self::Issued { issued_key, .. } => Some(issued_key),
            Self::NotPending { issued_key, .. } => issued_key.as_deref(),
        }
    }
}

/// An order owned by one approval while its key is mailed.
struct Claim {
    order: Order,
    key: String,
    claimed_at: DateTime<Utc>,
    /// The key row was written by this approval (and is removed on failure).
    wrote_key_row: bool,
}

enum Step {
    Deliver(Claim),
    Done(ApproveOutcome),
}

/// Approves orders and issues their license keys.
pub struct LicenseIssuer {
    db: Db,
    mailer: Arc<dyn EmailSender>,
    keys: Arc<dyn KeyGenerator>,
    mail_timeout: Duration,
}

impl LicenseIssuer {
    #[must_use]
    pub fn new(db: Db, mailer: Arc<dyn EmailSender>, keys: Arc<dyn KeyGenerator>) -> Self {
        Self {
            db,
            mailer,
            keys,
            mail_timeout: DEFAULT_MAIL_TIMEOUT,
        }
    }

    /// Overrides the email send timeout.
    #[must_use]
    pub fn with_mail_timeout(mut self, timeout: Duration) -> Self {
        self.mail_timeout = timeout;
        self
    }

    /// Approves a pending order.
    ///
    /// Re-approving an order that is already paid is not an error: it
    /// returns [`ApproveOutcome::NotPending`] carrying the existing key.
    ///
    /// # Errors
    ///
    /// - [`LicenseError::OrderNotFound`] if the order does not exist
    /// - [`LicenseError::ApprovalInProgress`] if another approval holds it
    /// - [`LicenseError::MailFailed`] if the email was refused or timed out
    /// - [`LicenseError::KeyGenerationExhausted`] if no unique key was found
    ///
    /// In every error case the order is left pending and unclaimed.
    pub async fn approve_order(&self, order_id: i64) -> LicenseResult<ApproveOutcome> {
        let claim = match self.claim(order_id).await? {
            Step::Deliver(claim) => claim,
            Step::Done(outcome) => return Ok(outcome),
        };

        match self.send_key(&claim).await {
            Ok(()) => self.settle(claim).await,
            Err(reason) => {
                warn!(
                    "License mail for order {} failed ({}), releasing claim",
                    claim.order.id, reason
                );
                if let Err(e) = self.release(&claim).await {
                    error!("Releasing claim on order {} failed: {}", claim.order.id, e);
                }
                Err(LicenseError::MailFailed(reason))
            }
        }
    }

    /// First unit: picks the key and claims the order.
    async fn claim(&self, order_id: i64) -> LicenseResult<Step> {
        let unit = self.db.begin().await?;

        let Some(order) = find_order(&unit, order_id)? else {
            unit.rollback()?;
            return Err(LicenseError::OrderNotFound(order_id));
        };

        if order.status != OrderStatus::Pending {
            unit.rollback()?;
            debug!("Order {} is {}, approval is a no-op", order.id, order.status);
            return Ok(Step::Done(ApproveOutcome::NotPending {
                order_id: order.id,
                status: order.status,
                issued_key: order.issued_key,
            }));
        }

        let now = Utc::now();
        if let Some(since) = order.claimed_at {
            if self.claim_is_live(since, now) {
                unit.rollback()?;
                debug!("Order {} already claimed at {}", order.id, since);
                return Err(LicenseError::ApprovalInProgress(order.id));
            }
            warn!("Claim on order {} from {} expired, taking it over", order.id, since);
        }

        let (key, wrote_key_row) = match find_key_for_order(&unit, order.id)? {
            Some(row) => {
                info!("Order {} already has key row {}, reusing it", order.id, row.license_key);
                (row.license_key, false)
            }
            None => {
                let key = match &order.issued_key {
                    Some(existing) => {
                        info!("Order {} already carries key {}, reusing it", order.id, existing);
                        existing.clone()
                    }
                    None => reserve_unique_key(&unit, self.keys.as_ref())?,
                };
                insert_key_row(&unit, &order, &key, now)?;
                (key, true)
            }
        };

        unit.execute(
            "UPDATE orders SET claimed_at = ?2 WHERE id = ?1",
            params![order.id, now],
        )?;
        unit.commit()?;

        Ok(Step::Deliver(Claim {
            order,
            key,
            claimed_at: now,
            wrote_key_row,
        }))
    }

    /// Mails the key; the error is the failure reason.
    async fn send_key(&self, claim: &Claim) -> Result<(), String> {
        let message = license_key_email(&claim.order.order_code, &claim.key);
        let sent = tokio::time::timeout(
            self.mail_timeout,
            self.mailer.send(&claim.order.email, &message),
        )
        .await;

        match sent {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.mail_timeout)),
        }
    }

    /// Second unit after a delivered mail: marks the order paid.
    async fn settle(&self, claim: Claim) -> LicenseResult<ApproveOutcome> {
        let Claim {
            order,
            key,
            claimed_at,
            ..
        } = claim;

        let settled = self
            .db
            .transaction(|tx| -> LicenseResult<bool> {
                let updated = tx.execute(
                    "UPDATE orders \
                     SET status = ?2, paid_at = ?3, issued_key = ?4, claimed_at = NULL \
                     WHERE id = ?1 AND status = ?5 AND claimed_at = ?6",
                    params![
                        order.id,
                        OrderStatus::Paid,
                        Utc::now(),
                        key,
                        OrderStatus::Pending,
                        claimed_at
                    ],
                )?;
                if updated == 1 {
                    return Ok(true);
                }
                // claim taken over; fine if the new owner settled with this key
                Ok(find_order(tx, order.id)?.is_some_and(|o| {
                    o.status == OrderStatus::Paid && o.issued_key.as_deref() == Some(key.as_str())
                }))
            })
            .await?;

        if !settled {
            warn!("Order {} changed hands while key {} was mailed", order.id, key);
            return Err(LicenseError::ApprovalInProgress(order.id));
        }

        info!("Order {} approved, key {} sent to {}", order.id, key, order.email);
        Ok(ApproveOutcome::Issued {
            order_id: order.id,
            issued_key: key,
            email: order.email,
        })
    }

    /// Second unit after a failed mail: undoes what [`Self::claim`] wrote.
    async fn release(&self, claim: &Claim) -> LicenseResult<()> {
        self.db
            .transaction(|tx| -> LicenseResult<()> {
                let released = tx.execute(
                    "UPDATE orders SET claimed_at = NULL \
                     WHERE id = ?1 AND status = ?2 AND claimed_at = ?3",
                    params![claim.order.id, OrderStatus::Pending, claim.claimed_at],
                )?;
                if released == 1 && claim.wrote_key_row {
                    tx.execute(
                        "DELETE FROM license_keys \
                         WHERE order_id = ?1 AND license_key = ?2 AND status = ?3",
                        params![claim.order.id, claim.key, KeyStatus::Unused],
                    )?;
                }
                Ok(())
            })
            .await
    }

    fn claim_is_live(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let ttl = self.mail_timeout.saturating_mul(2);
        // a claim from the future (clock step) counts as live
        (now - since).to_std().map_or(true, |age| age < ttl)
    }
}

/// Draws candidates until one is unused, up to [`MAX_KEY_ATTEMPTS`].
fn reserve_unique_key(conn: &Connection, keys: &dyn KeyGenerator) -> LicenseResult<String> {
    for attempt in 1..=MAX_KEY_ATTEMPTS {
        let candidate = keys.generate();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM license_keys WHERE license_key = ?1) \
                 OR EXISTS(SELECT 1 FROM orders WHERE issued_key = ?1)",
            [&candidate],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(candidate);
        }
        debug!("License key collision on attempt {}", attempt);
    }

    error!("failed_to_generate_unique_key after {} attempts", MAX_KEY_ATTEMPTS);
    Err(LicenseError::KeyGenerationExhausted {
        attempts: MAX_KEY_ATTEMPTS,
    })
}

/// Writes the order's key row; a key already owned by another order is a
/// conflict.
fn insert_key_row(
    conn: &Connection,
    order: &Order,
    key: &str,
    now: DateTime<Utc>,
) -> LicenseResult<()> {
    conn.execute(
        "INSERT INTO license_keys (license_key, email, order_id, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT DO NOTHING",
        params![key, order.email, order.id, KeyStatus::Unused, now],
    )?;

    match find_key_for_order(conn, order.id)? {
        Some(row) if row.license_key == key => Ok(()),
        _ => Err(LicenseError::KeyConflict {
            key: key.to_string(),
        }),
    }
}

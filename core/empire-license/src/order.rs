//! Purchase orders and the license keys issued for them.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use empire_db::{Db, DbError};
use empire_types::{normalize_email, required};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default and maximum page sizes for admin listings.
pub const DEFAULT_LIST_LIMIT: usize = 200;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting approval.
    Pending,
    /// Approved; a key has been issued and mailed.
    Paid,
    /// Cancelled. Cancellation deletes pending orders, so this only appears
    /// in rows written by other tools.
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for OrderStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|_| FromSqlError::InvalidType)
    }
}

/// State of an issued license key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Unused,
    Activated,
}

impl KeyStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Activated => "activated",
        }
    }
}

impl ToSql for KeyStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for KeyStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "unused" => Ok(Self::Unused),
            "activated" => Ok(Self::Activated),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub email: String,
    pub order_code: String,
    pub status: OrderStatus,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub issued_key: Option<String>,
    /// Set while an approval is delivering this order's key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

/// A license key row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKeyRecord {
    pub id: i64,
    #[serde(rename = "key")]
    pub license_key: String,
    pub email: String,
    pub order_id: i64,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub device_hash: Option<String>,
}

impl LicenseKeyRecord {
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.status == KeyStatus::Activated
    }
}

const ORDER_COLUMNS: &str =
    "id, email, order_code, status, amount, created_at, paid_at, issued_key, claimed_at";

const KEY_COLUMNS: &str =
    "id, license_key, email, order_id, status, created_at, activated_at, device_hash";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        email: row.get(1)?,
        order_code: row.get(2)?,
        status: row.get(3)?,
        amount: row.get(4)?,
        created_at: row.get(5)?,
        paid_at: row.get(6)?,
        issued_key: row.get(7)?,
        claimed_at: row.get(8)?,
    })
}

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<LicenseKeyRecord> {
    Ok(LicenseKeyRecord {
        id: row.get(0)?,
        license_key: row.get(1)?,
        email: row.get(2)?,
        order_id: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        activated_at: row.get(6)?,
        device_hash: row.get(7)?,
    })
}

pub(crate) fn find_order(conn: &Connection, id: i64) -> rusqlite::Result<Option<Order>> {
    conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
        [id],
        order_from_row,
    )
    .optional()
}

pub(crate) fn find_key_for_order(
    conn: &Connection,
    order_id: i64,
) -> rusqlite::Result<Option<LicenseKeyRecord>> {
    conn.query_row(
        &format!("SELECT {KEY_COLUMNS} FROM license_keys WHERE order_id = ?1"),
        [order_id],
        key_from_row,
    )
    .optional()
}

pub(crate) fn find_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<LicenseKeyRecord>> {
    conn.query_row(
        &format!("SELECT {KEY_COLUMNS} FROM license_keys WHERE license_key = ?1"),
        [key],
        key_from_row,
    )
    .optional()
}

pub(crate) fn order_is_paid(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?1 AND status = ?2)",
        params![id, OrderStatus::Paid],
        |row| row.get(0),
    )
}

pub(crate) fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Order intake, listing and cancellation.
#[derive(Clone)]
pub struct OrderBook {
    db: Db,
}

impl OrderBook {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Records a new pending order.
    ///
    /// # Errors
    ///
    /// Validation errors for a blank email/order code or a negative amount;
    /// [`LicenseError::OrderCodeExists`] when the code is taken.
    pub async fn create_order(
        &self,
        email: &str,
        order_code: &str,
        amount: i64,
    ) -> LicenseResult<Order> {
        let email = normalize_email(required(Some(email), "email")?);
        let order_code = required(Some(order_code), "orderCode")?.to_string();
        if amount < 0 {
            return Err(LicenseError::InvalidAmount(amount));
        }

        let order = self
            .db
            .transaction(|tx| -> LicenseResult<Order> {
                let inserted = tx.execute(
                    "INSERT INTO orders (email, order_code, status, amount, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![email, order_code, OrderStatus::Pending, amount, Utc::now()],
                );
                if let Err(e) = inserted {
                    let e = DbError::from(e);
                    if e.is_unique_violation() {
                        return Err(LicenseError::OrderCodeExists(order_code.clone()));
                    }
                    return Err(e.into());
                }
                let id = tx.last_insert_rowid();
                find_order(tx, id)?.ok_or(LicenseError::OrderNotFound(id))
            })
            .await?;

        tracing::info!(
            "Order {} created: code={} email={} amount={}",
            order.id, order.order_code, order.email, order.amount
        );
        Ok(order)
    }

    /// Returns one order.
    pub async fn get_order(&self, id: i64) -> LicenseResult<Option<Order>> {
        self.db
            .read(|conn| find_order(conn, id).map_err(LicenseError::from))
            .await
    }

    /// Lists orders, newest first, optionally filtered by status.
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> LicenseResult<Vec<Order>> {
        self.db
            .read(|conn| -> LicenseResult<Vec<Order>> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE (?1 IS NULL OR status = ?1) \
                     ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([status], order_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Deletes an order that is still pending, together with any unused key
    /// row a failed approval left behind.
    ///
    /// # Errors
    ///
    /// [`LicenseError::OrderNotFoundOrNotPending`] when there is no pending
    /// order with this id; [`LicenseError::ApprovalInProgress`] while an
    /// approval is delivering its key.
    pub async fn cancel_order(&self, id: i64) -> LicenseResult<()> {
        self.db
            .transaction(|tx| -> LicenseResult<()> {
                let order = find_order(tx, id)?
                    .filter(|o| o.status == OrderStatus::Pending)
                    .ok_or(LicenseError::OrderNotFoundOrNotPending(id))?;
                if order.claimed_at.is_some() {
                    return Err(LicenseError::ApprovalInProgress(id));
                }
                tx.execute(
                    "DELETE FROM license_keys WHERE order_id = ?1 AND status = ?2",
                    params![id, KeyStatus::Unused],
                )?;
                tx.execute("DELETE FROM orders WHERE id = ?1", [id])?;
                Ok(())
            })
            .await?;

        tracing::info!("Order {} cancelled", id);
        Ok(())
    }

    /// Lists issued keys, newest first.
    pub async fn list_license_keys(
        &self,
        limit: Option<usize>,
    ) -> LicenseResult<Vec<LicenseKeyRecord>> {
        let limit = clamp_limit(limit) as i64;
        self.db
            .read(|conn| -> LicenseResult<Vec<LicenseKeyRecord>> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {KEY_COLUMNS} FROM license_keys ORDER BY id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map([limit], key_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Returns the key issued for an order, if any.
    pub async fn license_key_for_order(
        &self,
        order_id: i64,
    ) -> LicenseResult<Option<LicenseKeyRecord>> {
        self.db
            .read(|conn| find_key_for_order(conn, order_id).map_err(LicenseError::from))
            .await
    }

    /// Looks up a key by its (normalized) value.
    pub async fn find_license_key(&self, key: &str) -> LicenseResult<Option<LicenseKeyRecord>> {
        let key = crate::keygen::normalize_key(key);
        self.db
            .read(|conn| find_key(conn, &key).map_err(LicenseError::from))
            .await
    }
}

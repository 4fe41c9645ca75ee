//! A unit of work that may outlive a single synchronous closure.

use crate::error::DbResult;
use rusqlite::Connection;
use std::ops::Deref;
use tokio::sync::OwnedMutexGuard;

/// An open `BEGIN IMMEDIATE` transaction holding the store's connection.
///
/// Only the owner may touch the store until the unit is committed, rolled
/// back, or dropped. Drop without commit rolls back.
pub struct UnitOfWork {
    conn: OwnedMutexGuard<Connection>,
    finished: bool,
}

impl UnitOfWork {
    pub(crate) fn start(conn: OwnedMutexGuard<Connection>) -> DbResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Makes every change in the unit durable.
    pub fn commit(mut self) -> DbResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    /// Discards every change in the unit.
    ///
    /// If `ROLLBACK` itself fails the unit stays unfinished, so dropping it
    /// retries the rollback before the connection is released.
    pub fn rollback(mut self) -> DbResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.finished = true;
        Ok(())
    }
}

impl Deref for UnitOfWork {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::error!("Rollback of abandoned unit failed: {}", e);
        } else {
            tracing::debug!("Abandoned unit rolled back");
        }
    }
}

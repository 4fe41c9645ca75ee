//! SQLite store for the Empire Run backoffice.
//!
//! One [`Db`] handle is opened at process start and cloned into every
//! service. It owns a single SQLite connection behind an async mutex; all
//! writes go through an atomic unit:
//!
//! - [`Db::transaction`] runs a synchronous closure inside `BEGIN IMMEDIATE`
//!   and commits on `Ok`, rolls back on `Err`.
//! - [`Db::begin`] hands out a [`UnitOfWork`] that may be held across an
//!   `.await`. Every other caller waits while it is open, so no unit is
//!   held across slow I/O such as the license email.
//!   Dropping it without [`UnitOfWork::commit`] rolls back.
//!
//! Holding the connection lock plus `BEGIN IMMEDIATE` is the exclusive
//! intent that check-then-act sequences (approval, activation) rely on.

mod error;
pub mod schema;
mod unit;

pub use error::{DbError, DbResult};
pub use schema::SCHEMA_VERSION;
pub use unit::UnitOfWork;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the store.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Opens (or creates) the store at `path` and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        tracing::info!("Opening store at {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> DbResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Store journal mode: {}", mode);
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` inside an exclusive transaction.
    ///
    /// Commits when `f` returns `Ok`; the transaction is rolled back when `f`
    /// returns `Err` (or panics).
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }

    /// Runs a read-only closure against the connection without opening a
    /// transaction.
    pub async fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let conn = self.conn.lock().await;
        f(&conn)
    }

    /// Starts a unit of work that can span `.await` points.
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        UnitOfWork::start(conn)
    }

    /// Cheap liveness probe used by the health endpoint.
    pub async fn ping(&self) -> DbResult<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Returns the schema version recorded in the store.
    pub async fn schema_version(&self) -> DbResult<u32> {
        let conn = self.conn.lock().await;
        schema::current_version(&conn)
    }
}

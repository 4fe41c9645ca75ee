//! Shared test helpers for license tests.

#![allow(dead_code)]

use async_trait::async_trait;
use empire_db::{Db, DbError};
use empire_license::{KeyGenerator, LicenseIssuer, OrderBook, RandomKeyGenerator};
use empire_mail::{EmailMessage, EmailSender, MailError, MailResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Records every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, EmailMessage)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

/// Refuses every message.
pub struct FailingMailer;

#[async_trait]
impl EmailSender for FailingMailer {
    async fn send(&self, _to: &str, _message: &EmailMessage) -> MailResult<()> {
        Err(MailError::Rejected {
            status: 503,
            body: "provider unavailable".into(),
        })
    }
}

/// Never answers within any sane timeout.
pub struct SlowMailer(pub Duration);

#[async_trait]
impl EmailSender for SlowMailer {
    async fn send(&self, _to: &str, _message: &EmailMessage) -> MailResult<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

/// Holds every send until released; `entered` fires when a send starts.
#[derive(Default)]
pub struct GateMailer {
    pub entered: Notify,
    pub release: Notify,
    inner: RecordingMailer,
}

impl GateMailer {
    pub fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.inner.sent()
    }
}

#[async_trait]
impl EmailSender for GateMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.send(to, message).await
    }
}

/// Always returns the same key.
pub struct FixedKeyGenerator(pub &'static str);

impl KeyGenerator for FixedKeyGenerator {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

/// Returns the queued keys in order, then falls back to random keys.
pub struct SequenceKeyGenerator {
    keys: Mutex<VecDeque<String>>,
}

impl SequenceKeyGenerator {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: Mutex::new(keys.iter().map(|k| k.to_string()).collect()),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn generate(&self) -> String {
        self.keys
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomKeyGenerator.generate())
    }
}

pub fn db() -> Db {
    Db::open_in_memory().unwrap()
}

pub fn issuer(db: &Db, mailer: Arc<dyn EmailSender>) -> LicenseIssuer {
    LicenseIssuer::new(db.clone(), mailer, Arc::new(RandomKeyGenerator))
}

/// Creates a pending order and returns its id.
pub async fn pending_order(db: &Db, email: &str, code: &str) -> i64 {
    OrderBook::new(db.clone())
        .create_order(email, code, 1999)
        .await
        .unwrap()
        .id
}

/// Runs raw SQL against the store, for setting up states other tools leave.
pub async fn execute(db: &Db, sql: &str, params: impl rusqlite::Params) {
    db.transaction(|tx| tx.execute(sql, params).map_err(DbError::from))
        .await
        .unwrap();
}

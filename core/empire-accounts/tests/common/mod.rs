//! Shared test helpers for account tests.

#![allow(dead_code)]

use empire_accounts::{AccountRef, ReportAggregator, ReportEvent};
use empire_db::Db;

pub fn db() -> Db {
    Db::open_in_memory().unwrap()
}

pub fn account(email: &str, username: &str) -> AccountRef {
    AccountRef::new(email, username).unwrap()
}

/// Registers `account` from `device_id`.
pub async fn seen_on(db: &Db, account: &AccountRef, device_id: &str) {
    ReportAggregator::new(db.clone())
        .record(account, device_id, ReportEvent::Register)
        .await
        .unwrap();
}

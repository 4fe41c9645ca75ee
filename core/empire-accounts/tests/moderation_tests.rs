mod common;

use common::*;
use empire_accounts::{DeviceStatus, ModerationService};
use empire_db::{Db, DbError};

async fn exec(db: &Db, sql: &str) {
    db.transaction(|tx| tx.execute_batch(sql).map_err(DbError::from))
        .await
        .unwrap();
}

// ── Warnings ────────────────────────────────────────────────────

#[tokio::test]
async fn warn_device_flags_every_account_seen_on_it() {
    let db = db();
    let a = account("a@example.com", "alpha");
    let b = account("b@example.com", "beta");
    let c = account("c@example.com", "gamma");
    seen_on(&db, &a, "dev-shared").await;
    seen_on(&db, &b, "dev-shared").await;
    seen_on(&db, &c, "dev-other").await;
    let moderation = ModerationService::new(db);

    let affected = moderation.warn_device("dev-shared").await.unwrap();
    assert_eq!(affected, 2);

    assert!(moderation.device_status(&a, "dev-shared").await.unwrap().is_warned);
    assert!(moderation.device_status(&b, "dev-shared").await.unwrap().is_warned);
    assert!(!moderation.device_status(&c, "dev-other").await.unwrap().is_warned);
}

#[tokio::test]
async fn warning_follows_account_to_other_devices() {
    let db = db();
    let a = account("a@example.com", "alpha");
    seen_on(&db, &a, "dev-1").await;
    seen_on(&db, &a, "dev-2").await;
    let moderation = ModerationService::new(db);

    moderation.warn_device("dev-1").await.unwrap();
    assert!(moderation.device_status(&a, "dev-2").await.unwrap().is_warned);
}

#[tokio::test]
async fn warn_unseen_device_affects_nobody() {
    let db = db();
    let a = account("a@example.com", "alpha");
    seen_on(&db, &a, "dev-1").await;
    let moderation = ModerationService::new(db);

    assert_eq!(moderation.warn_device("dev-unknown").await.unwrap(), 0);
    assert!(!moderation.device_status(&a, "dev-1").await.unwrap().is_warned);
}

#[tokio::test]
async fn failed_upsert_rolls_back_whole_warning_batch() {
    let db = db();
    let a = account("a@example.com", "alpha");
    let b = account("b@example.com", "beta");
    seen_on(&db, &a, "dev-shared").await;
    seen_on(&db, &b, "dev-shared").await;
    // alpha is written first, then beta's upsert aborts
    exec(
        &db,
        "CREATE TRIGGER refuse_beta BEFORE INSERT ON account_warnings \
         WHEN NEW.username = 'beta' BEGIN SELECT RAISE(ABORT, 'refused'); END;",
    )
    .await;
    let moderation = ModerationService::new(db.clone());

    let err = moderation.warn_device("dev-shared").await.unwrap_err();
    assert_eq!(err.code(), "server_error");
    assert!(!moderation.device_status(&a, "dev-shared").await.unwrap().is_warned);
    assert!(!moderation.device_status(&b, "dev-shared").await.unwrap().is_warned);

    exec(&db, "DROP TRIGGER refuse_beta;").await;
    assert_eq!(moderation.warn_device("dev-shared").await.unwrap(), 2);
    assert!(moderation.device_status(&a, "dev-shared").await.unwrap().is_warned);
}

#[tokio::test]
async fn warning_reaches_rows_written_by_other_tools() {
    let db = db();
    let a = account("a@example.com", "alpha");
    seen_on(&db, &a, "dev-shared").await;
    exec(
        &db,
        "INSERT INTO account_devices (email, username, device_id, first_seen_at) \
         VALUES ('legacy@example.com', '', 'dev-shared', '2024-01-01T00:00:00Z');",
    )
    .await;
    let moderation = ModerationService::new(db.clone());

    assert_eq!(moderation.warn_device("dev-shared").await.unwrap(), 2);
    let legacy_warned: bool = db
        .read(|conn| {
            conn.query_row(
                "SELECT is_warned FROM account_warnings \
                 WHERE email = 'legacy@example.com' AND username = ''",
                [],
                |row| row.get(0),
            )
        })
        .await
        .unwrap();
    assert!(legacy_warned);
}

#[tokio::test]
async fn clear_and_ack_reset_warning() {
    let db = db();
    let a = account("a@example.com", "alpha");
    seen_on(&db, &a, "dev-1").await;
    let moderation = ModerationService::new(db);

    moderation.warn_device("dev-1").await.unwrap();
    moderation.clear_warn(&a).await.unwrap();
    assert!(!moderation.device_status(&a, "dev-1").await.unwrap().is_warned);
    // idempotent
    moderation.clear_warn(&a).await.unwrap();

    moderation.warn_device("dev-1").await.unwrap();
    moderation.ack_warning(&a).await.unwrap();
    assert!(!moderation.device_status(&a, "dev-1").await.unwrap().is_warned);
}

// ── Bans ────────────────────────────────────────────────────────

#[tokio::test]
async fn ban_is_scoped_to_device() {
    let db = db();
    let a = account("a@example.com", "alpha");
    seen_on(&db, &a, "dev-1").await;
    seen_on(&db, &a, "dev-2").await;
    let moderation = ModerationService::new(db);

    moderation.set_ban("dev-1", true).await.unwrap();
    assert_eq!(
        moderation.device_status(&a, "dev-1").await.unwrap(),
        DeviceStatus {
            is_banned: true,
            is_warned: false
        }
    );
    assert!(!moderation.device_status(&a, "dev-2").await.unwrap().is_banned);

    moderation.set_ban("dev-1", false).await.unwrap();
    assert!(!moderation.device_status(&a, "dev-1").await.unwrap().is_banned);
}

#[tokio::test]
async fn status_of_unknown_account_and_device_is_clear() {
    let moderation = ModerationService::new(db());
    let status = moderation
        .device_status(&account("n@o.p", "ghost"), "dev-x")
        .await
        .unwrap();
    assert_eq!(status, DeviceStatus::default());
}

#[tokio::test]
async fn blank_device_id_is_rejected() {
    let moderation = ModerationService::new(db());
    assert_eq!(
        moderation.warn_device("").await.unwrap_err().code(),
        "missing_device_id"
    );
    assert_eq!(
        moderation.set_ban(" ", true).await.unwrap_err().code(),
        "missing_device_id"
    );
}

// ── Search ──────────────────────────────────────────────────────

#[tokio::test]
async fn search_matches_any_column_case_insensitively() {
    let db = db();
    let a = account("alice@example.com", "Knight");
    let b = account("bob@example.com", "rogue");
    seen_on(&db, &a, "PC-123").await;
    seen_on(&db, &b, "phone-9").await;
    let moderation = ModerationService::new(db);
    moderation.set_ban("phone-9", true).await.unwrap();

    let all = moderation.search("", None).await.unwrap();
    assert_eq!(all.len(), 2);

    let by_email = moderation.search("ALICE", None).await.unwrap();
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].device_id, "PC-123");

    let by_user = moderation.search("knight", None).await.unwrap();
    assert_eq!(by_user.len(), 1);

    let by_device = moderation.search("phone", None).await.unwrap();
    assert_eq!(by_device.len(), 1);
    assert!(by_device[0].is_banned);
    assert!(!by_device[0].is_warned);

    assert_eq!(moderation.search("", Some(1)).await.unwrap().len(), 1);
}

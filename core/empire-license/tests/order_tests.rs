mod common;

use common::*;
use empire_license::{LicenseError, OrderBook, OrderStatus};
use std::sync::Arc;

// ── Intake ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_order_normalizes_email() {
    let book = OrderBook::new(db());
    let order = book
        .create_order("  Someone@Example.Com ", " ER-77 ", 2500)
        .await
        .unwrap();

    assert_eq!(order.email, "someone@example.com");
    assert_eq!(order.order_code, "ER-77");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.amount, 2500);
    assert!(order.paid_at.is_none());
    assert!(order.issued_key.is_none());
}

#[tokio::test]
async fn duplicate_order_code_is_rejected() {
    let book = OrderBook::new(db());
    book.create_order("a@b.c", "DUP", 1).await.unwrap();

    let err = book.create_order("x@y.z", "DUP", 1).await.unwrap_err();
    assert!(matches!(err, LicenseError::OrderCodeExists(ref c) if c == "DUP"));
    assert_eq!(err.code(), "order_code_exists");
}

#[tokio::test]
async fn create_order_validates_input() {
    let book = OrderBook::new(db());

    let err = book.create_order("", "C1", 1).await.unwrap_err();
    assert_eq!(err.code(), "missing_email");

    let err = book.create_order("a@b.c", "  ", 1).await.unwrap_err();
    assert_eq!(err.code(), "missing_order_code");

    let err = book.create_order("a@b.c", "C1", -5).await.unwrap_err();
    assert!(matches!(err, LicenseError::InvalidAmount(-5)));
}

// ── Listing ─────────────────────────────────────────────────────

#[tokio::test]
async fn list_orders_filters_by_status_newest_first() {
    let db = db();
    let book = OrderBook::new(db.clone());
    let first = pending_order(&db, "a@b.c", "L-1").await;
    let second = pending_order(&db, "a@b.c", "L-2").await;
    let third = pending_order(&db, "a@b.c", "L-3").await;
    issuer(&db, Arc::new(RecordingMailer::default()))
        .approve_order(second)
        .await
        .unwrap();

    let all: Vec<i64> = book.list_orders(None).await.unwrap().iter().map(|o| o.id).collect();
    assert_eq!(all, vec![third, second, first]);

    let pending: Vec<i64> = book
        .list_orders(Some(OrderStatus::Pending))
        .await
        .unwrap()
        .iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(pending, vec![third, first]);

    let paid = book.list_orders(Some(OrderStatus::Paid)).await.unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].id, second);
}

#[tokio::test]
async fn list_license_keys_respects_limit() {
    let db = db();
    let issuer = issuer(&db, Arc::new(RecordingMailer::default()));
    for i in 0..5 {
        let id = pending_order(&db, "a@b.c", &format!("K-{i}")).await;
        issuer.approve_order(id).await.unwrap();
    }
    let book = OrderBook::new(db);

    assert_eq!(book.list_license_keys(None).await.unwrap().len(), 5);
    assert_eq!(book.list_license_keys(Some(2)).await.unwrap().len(), 2);
    // zero is clamped up to one
    assert_eq!(book.list_license_keys(Some(0)).await.unwrap().len(), 1);
}

// ── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn cancel_deletes_pending_order() {
    let db = db();
    let id = pending_order(&db, "a@b.c", "X-1").await;
    let book = OrderBook::new(db);

    book.cancel_order(id).await.unwrap();
    assert!(book.get_order(id).await.unwrap().is_none());

    let err = book.cancel_order(id).await.unwrap_err();
    assert_eq!(err.code(), "order_not_found_or_not_pending");
}

#[tokio::test]
async fn cancel_removes_key_row_left_by_failed_approval() {
    let db = db();
    let id = pending_order(&db, "a@b.c", "X-3").await;
    execute(
        &db,
        "INSERT INTO license_keys (license_key, email, order_id, status, created_at) \
         VALUES ('LEFTKEY234', 'a@b.c', ?1, 'unused', '2025-01-01 00:00:00+00:00')",
        [id],
    )
    .await;
    let book = OrderBook::new(db);

    book.cancel_order(id).await.unwrap();
    assert!(book.get_order(id).await.unwrap().is_none());
    assert!(book.find_license_key("LEFTKEY234").await.unwrap().is_none());
}

#[tokio::test]
async fn paid_order_cannot_be_cancelled() {
    let db = db();
    let id = pending_order(&db, "a@b.c", "X-2").await;
    issuer(&db, Arc::new(RecordingMailer::default()))
        .approve_order(id)
        .await
        .unwrap();
    let book = OrderBook::new(db);

    let err = book.cancel_order(id).await.unwrap_err();
    assert!(matches!(err, LicenseError::OrderNotFoundOrNotPending(i) if i == id));
    assert_eq!(
        book.get_order(id).await.unwrap().unwrap().status,
        OrderStatus::Paid
    );
}

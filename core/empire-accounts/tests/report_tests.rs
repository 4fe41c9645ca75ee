mod common;

use common::*;
use empire_accounts::{ReportAggregator, ReportEvent};

// ── Counters ────────────────────────────────────────────────────

#[tokio::test]
async fn register_creates_empty_report() {
    let reports = ReportAggregator::new(db());
    let acct = account("P@Example.com", "hero");

    let report = reports.record(&acct, "dev-1", ReportEvent::Register).await.unwrap();
    assert_eq!(report.email, "p@example.com");
    assert_eq!(report.username, "hero");
    assert_eq!(report.wins_total, 0);
    assert_eq!(report.losses_total, 0);
    assert!(!report.has_won);
    assert!(report.first_win_at.is_none());
    assert_eq!(report.achievements_count, 0);
}

#[tokio::test]
async fn wins_and_losses_accumulate() {
    let reports = ReportAggregator::new(db());
    let acct = account("p@example.com", "hero");

    reports.record(&acct, "dev-1", ReportEvent::Lose).await.unwrap();
    let after_first_win = reports.record(&acct, "dev-1", ReportEvent::Win).await.unwrap();
    let first_win_at = after_first_win.first_win_at.unwrap();
    reports.record(&acct, "dev-1", ReportEvent::Win).await.unwrap();
    let report = reports.record(&acct, "dev-1", ReportEvent::Lose).await.unwrap();

    assert_eq!(report.wins_total, 2);
    assert_eq!(report.losses_total, 2);
    assert!(report.has_won);
    assert_eq!(report.first_win_at, Some(first_win_at));
}

#[tokio::test]
async fn report_read_returns_none_for_unknown_account() {
    let reports = ReportAggregator::new(db());
    assert!(reports.report(&account("x@y.z", "nobody")).await.unwrap().is_none());
}

// ── Achievements ────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_achievement_counts_once() {
    let reports = ReportAggregator::new(db());
    let acct = account("p@example.com", "hero");

    reports
        .record(&acct, "dev-1", ReportEvent::Achievement("first_blood".into()))
        .await
        .unwrap();
    let report = reports
        .record(&acct, "dev-2", ReportEvent::Achievement("first_blood".into()))
        .await
        .unwrap();
    assert_eq!(report.achievements_count, 1);

    let report = reports
        .record(&acct, "dev-1", ReportEvent::Achievement("conqueror".into()))
        .await
        .unwrap();
    assert_eq!(report.achievements_count, 2);

    let keys: Vec<String> = reports
        .achievements(&acct)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.achievement_key)
        .collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"first_blood".to_string()));
    assert!(keys.contains(&"conqueror".to_string()));
}

#[tokio::test]
async fn achievements_are_per_account() {
    let db = db();
    let reports = ReportAggregator::new(db);
    let a = account("p@example.com", "hero");
    let b = account("p@example.com", "sidekick");

    reports
        .record(&a, "dev-1", ReportEvent::Achievement("k".into()))
        .await
        .unwrap();
    let report_b = reports
        .record(&b, "dev-1", ReportEvent::Achievement("k".into()))
        .await
        .unwrap();
    assert_eq!(report_b.achievements_count, 1);
}

// ── Validation ──────────────────────────────────────────────────

#[tokio::test]
async fn blank_inputs_are_rejected() {
    let reports = ReportAggregator::new(db());
    let acct = account("p@example.com", "hero");

    let err = reports.record(&acct, "  ", ReportEvent::Win).await.unwrap_err();
    assert_eq!(err.code(), "missing_device_id");

    let err = reports
        .record(&acct, "dev-1", ReportEvent::Achievement(" ".into()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "missing_achievement_key");

    assert!(reports.report(&acct).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_wins_are_not_lost() {
    let reports = ReportAggregator::new(db());
    let acct = account("p@example.com", "hero");

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let reports = reports.clone();
            let acct = acct.clone();
            tokio::spawn(async move { reports.record(&acct, "dev-1", ReportEvent::Win).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let report = reports.report(&acct).await.unwrap().unwrap();
    assert_eq!(report.wins_total, 20);
}

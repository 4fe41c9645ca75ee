use empire_db::Db;
use empire_saves::{SaveError, SaveStore};
use empire_types::AccountRef;

fn store() -> SaveStore {
    SaveStore::new(Db::open_in_memory().unwrap())
}

fn account(email: &str, username: &str) -> AccountRef {
    AccountRef::new(email, username).unwrap()
}

// ── Sync / fetch ────────────────────────────────────────────────

#[tokio::test]
async fn sync_then_fetch() {
    let store = store();
    let acct = account(" Player@Example.COM", "hero");

    let receipt = store.sync(&acct, r#"{"level":3}"#).await.unwrap();
    assert_eq!(receipt.email, "player@example.com");
    assert_eq!(receipt.username, "hero");

    let save = store.fetch(&account("player@example.com", "hero")).await.unwrap();
    assert_eq!(save.save_json, r#"{"level":3}"#);
    assert_eq!(save.updated_at, receipt.updated_at);
}

#[tokio::test]
async fn sync_replaces_previous_save() {
    let store = store();
    let acct = account("p@example.com", "hero");

    let first = store.sync(&acct, "v1").await.unwrap();
    let second = store.sync(&acct, "v2").await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(store.fetch(&acct).await.unwrap().save_json, "v2");
}

#[tokio::test]
async fn fetch_missing_is_not_found() {
    let err = store().fetch(&account("p@example.com", "nobody")).await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn empty_save_is_rejected() {
    let err = store().sync(&account("p@example.com", "hero"), "  ").await.unwrap_err();
    assert_eq!(err.code(), "missing_save_json");
}

// ── Listing ─────────────────────────────────────────────────────

#[tokio::test]
async fn list_by_email_and_emails() {
    let store = store();
    store.sync(&account("a@example.com", "one"), "x").await.unwrap();
    store.sync(&account("a@example.com", "two"), "y").await.unwrap();
    store.sync(&account("b@example.com", "solo"), "z").await.unwrap();

    let entries = store.list_by_email("A@example.com").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["two", "one"]);

    let emails = store.list_emails().await.unwrap();
    assert_eq!(emails.len(), 2);
    let a = emails.iter().find(|e| e.email == "a@example.com").unwrap();
    assert_eq!(a.save_count, 2);

    assert_eq!(
        store.list_by_email("").await.unwrap_err().code(),
        "missing_email"
    );
}

// ── Deletion ────────────────────────────────────────────────────

#[tokio::test]
async fn delete_single_save() {
    let store = store();
    let acct = account("a@example.com", "one");
    store.sync(&acct, "x").await.unwrap();

    store.delete(&acct).await.unwrap();
    assert!(matches!(store.fetch(&acct).await, Err(SaveError::NotFound(_))));
    assert!(matches!(store.delete(&acct).await, Err(SaveError::NotFound(_))));
}

#[tokio::test]
async fn delete_all_for_email_counts_rows() {
    let store = store();
    store.sync(&account("a@example.com", "one"), "x").await.unwrap();
    store.sync(&account("a@example.com", "two"), "y").await.unwrap();
    store.sync(&account("b@example.com", "solo"), "z").await.unwrap();

    assert_eq!(store.delete_all_for_email(" A@EXAMPLE.com ").await.unwrap(), 2);
    assert_eq!(store.delete_all_for_email("a@example.com").await.unwrap(), 0);
    assert_eq!(store.list_emails().await.unwrap().len(), 1);
}

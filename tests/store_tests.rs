mod common;

use serde_json::json;

use bet_tracker::db::{Collection, LocalStore, StoreError};

#[tokio::test]
async fn test_fresh_store_is_version_one_with_default_profile() {
    let (_dir, path) = common::temp_store_path();
    let store = common::open_store(&path).await;

    assert_eq!(store.schema_version().await.unwrap(), 1);
    let profiles = store.get_all(Collection::Profiles).await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["name"], "Default");
    assert!(store.get_all(Collection::Bets).await.is_empty());
}

#[tokio::test]
async fn test_reopening_does_not_bump_version_or_reseed() {
    let (_dir, path) = common::temp_store_path();
    drop(common::open_store(&path).await);

    let store = common::open_store(&path).await;
    assert_eq!(store.schema_version().await.unwrap(), 1);
    assert_eq!(store.get_all(Collection::Profiles).await.len(), 1);
}

#[tokio::test]
async fn test_upgrade_creates_missing_collections_and_keeps_others() {
    let (_dir, path) = common::temp_store_path();
    {
        let store = common::open_store(&path).await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, text TEXT)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO notes (text) VALUES ('keep me')")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("DROP TABLE bets").execute(store.pool()).await.unwrap();
        store.pool().close().await;
    }

    let store = common::open_store(&path).await;
    assert_eq!(store.schema_version().await.unwrap(), 2);
    assert!(store.get_all(Collection::Bets).await.is_empty());
    // profiles already existed, so no second default row
    assert_eq!(store.get_all(Collection::Profiles).await.len(), 1);

    let note: String = sqlx::query_scalar("SELECT text FROM notes")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(note, "keep me");
}

#[tokio::test]
async fn test_add_put_delete() {
    let (_dir, path) = common::temp_store_path();
    let store = common::open_store(&path).await;

    let auto = store
        .add(Collection::Bets, &json!({"amount": 10, "status": "pending"}))
        .await
        .unwrap();
    let explicit = store
        .add(Collection::Bets, &json!({"id": 5000, "amount": 20}))
        .await
        .unwrap();
    assert_eq!(explicit, 5000);
    assert_ne!(auto, explicit);
    assert_eq!(store.max_id(Collection::Bets).await, 5000);

    // add never overwrites
    let dup = store.add(Collection::Bets, &json!({"id": 5000, "amount": 99})).await;
    assert!(matches!(dup, Err(StoreError::Query(_))));

    store
        .put(Collection::Bets, &json!({"id": 5000, "amount": 30}))
        .await
        .unwrap();
    let doc = store.get_by_id(Collection::Bets, 5000).await.unwrap();
    assert_eq!(doc["amount"], 30);
    assert_eq!(doc["id"], 5000);

    let missing = store.put(Collection::Bets, &json!({"amount": 1})).await;
    assert!(matches!(missing, Err(StoreError::MissingId(_))));

    store.delete(Collection::Bets, 5000).await.unwrap();
    assert!(store.get_by_id(Collection::Bets, 5000).await.is_none());
    assert_eq!(store.get_all(Collection::Bets).await.len(), 1);
}

#[tokio::test]
async fn test_replace_all_is_atomic() {
    let (_dir, path) = common::temp_store_path();
    let store = common::open_store(&path).await;
    store
        .put_many(
            Collection::Bets,
            &[json!({"id": 1, "amount": 1}), json!({"id": 2, "amount": 2})],
        )
        .await
        .unwrap();

    store
        .replace_all(Collection::Bets, &[json!({"id": 7, "amount": 7})])
        .await
        .unwrap();
    let ids: Vec<i64> = store
        .get_all(Collection::Bets)
        .await
        .iter()
        .filter_map(|d| d["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![7]);

    // A document without an id aborts the whole replacement.
    let result = store
        .replace_all(Collection::Bets, &[json!({"id": 8}), json!({"amount": 9})])
        .await;
    assert!(result.is_err());
    assert_eq!(store.get_all(Collection::Bets).await.len(), 1);
}

#[tokio::test]
async fn test_cascade_delete_counts_bets() {
    let (_dir, path) = common::temp_store_path();
    let store = common::open_store(&path).await;
    let profile = store
        .add(Collection::Profiles, &json!({"name": "Temp"}))
        .await
        .unwrap();
    store
        .put_many(
            Collection::Bets,
            &[
                json!({"id": 1, "profile_id": profile}),
                json!({"id": 2, "profile_id": profile}),
                json!({"id": 3, "profile_id": null}),
            ],
        )
        .await
        .unwrap();

    assert_eq!(store.delete_profile_cascade(profile).await.unwrap(), 2);
    assert_eq!(store.get_all(Collection::Bets).await.len(), 1);
    assert!(store.get_by_id(Collection::Profiles, profile).await.is_none());
}

#[tokio::test]
async fn test_reset_starts_over() {
    let (_dir, path) = common::temp_store_path();
    let store = common::open_store(&path).await;
    store
        .add(Collection::Bets, &json!({"amount": 1}))
        .await
        .unwrap();

    let store = store.reset().await.unwrap();
    assert!(store.get_all(Collection::Bets).await.is_empty());
    assert_eq!(store.get_all(Collection::Profiles).await.len(), 1);
    assert_eq!(store.schema_version().await.unwrap(), 1);

    // reset_at also recovers a path that holds garbage
    store.pool().close().await;
    std::fs::write(&path, b"definitely not sqlite").unwrap();
    assert!(LocalStore::open(&path).await.is_err());
    let store = LocalStore::reset_at(&path).await.unwrap();
    assert_eq!(store.schema_version().await.unwrap(), 1);
}

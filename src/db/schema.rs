//! Lazy, versioned schema for the local store.
//!
//! The schema version lives in `PRAGMA user_version`. Opening a store only
//! creates the collections that are missing, in a single transaction, and
//! bumps the version by one. Tables the tracker does not know about are never
//! touched.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use super::{Collection, StoreError};
use crate::models::profile::{DEFAULT_PROFILE_COLOR, DEFAULT_PROFILE_ICON, DEFAULT_PROFILE_NAME};

/// Current `user_version` of the store.
pub async fn version(pool: &SqlitePool) -> Result<i64, StoreError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Create missing collections and return the resulting schema version.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<i64, StoreError> {
    let existing: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    let missing: Vec<Collection> = Collection::ALL
        .into_iter()
        .filter(|c| !existing.iter().any(|name| name == c.table()))
        .collect();

    let current = version(pool).await?;
    if missing.is_empty() {
        return Ok(current);
    }

    let mut tx = pool.begin().await?;

    for collection in &missing {
        let table = collection.table();
        sqlx::query(&format!(
            "CREATE TABLE {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)"
        ))
        .execute(&mut *tx)
        .await?;

        match collection {
            Collection::Bets => {
                sqlx::query(
                    "CREATE INDEX IF NOT EXISTS idx_bets_status ON bets (json_extract(body, '$.status'))",
                )
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    "CREATE INDEX IF NOT EXISTS idx_bets_profile ON bets (json_extract(body, '$.profile_id'))",
                )
                .execute(&mut *tx)
                .await?;
            }
            Collection::Profiles => {
                let default_profile = json!({
                    "name": DEFAULT_PROFILE_NAME,
                    "description": "",
                    "color": DEFAULT_PROFILE_COLOR,
                    "icon": DEFAULT_PROFILE_ICON,
                    "created_at": Utc::now().to_rfc3339(),
                });
                sqlx::query("INSERT INTO profiles (body) VALUES (?)")
                    .bind(default_profile.to_string())
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    let next = current + 1;
    sqlx::query(&format!("PRAGMA user_version = {next}"))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        from_version = current,
        to_version = next,
        created = ?missing.iter().map(|c| c.table()).collect::<Vec<_>>(),
        "Local store schema upgraded"
    );

    Ok(next)
}

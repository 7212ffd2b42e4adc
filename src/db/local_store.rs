use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{schema, Collection, StoreError};

/// Embedded document store with one table per [`Collection`].
///
/// Records are JSON documents keyed by an integer id. The id lives in its own
/// column and is injected back into the document on read. Reads never fail:
/// errors are logged and surface as empty results, since this store is itself
/// the fallback. Writes propagate their errors.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl LocalStore {
    /// Open (or create) the store and bring its schema up to date.
    /// Failures here are fatal for the tracker.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StoreError::Open)?;

        // Verify connectivity
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(StoreError::Open)?;

        let version = schema::ensure_schema(&pool).await?;
        tracing::info!(path = %path.display(), version, "Local store opened");

        Ok(Self { pool, path })
    }

    /// Drop every collection and start over with a fresh store.
    /// Destructive; only ever called on explicit request.
    pub async fn reset(self) -> Result<Self, StoreError> {
        self.pool.close().await;
        Self::reset_at(&self.path).await
    }

    /// Same as [`LocalStore::reset`] for a store that failed to open.
    pub async fn reset_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        for file in database_files(path) {
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(path = %path.display(), "Local store deleted");

        Self::open(path).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        schema::version(&self.pool).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Get every document in a collection, ordered by id.
    pub async fn get_all(&self, collection: Collection) -> Vec<Value> {
        let sql = format!("SELECT id, body FROM {} ORDER BY id", collection.table());
        match sqlx::query_as::<_, (i64, String)>(&sql)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(id, body)| document_with_id(collection, id, &body))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, %collection, "Local store read failed");
                Vec::new()
            }
        }
    }

    pub async fn get_by_id(&self, collection: Collection, id: i64) -> Option<Value> {
        let sql = format!("SELECT id, body FROM {} WHERE id = ?", collection.table());
        match sqlx::query_as::<_, (i64, String)>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.and_then(|(id, body)| document_with_id(collection, id, &body)),
            Err(e) => {
                tracing::warn!(error = %e, %collection, id, "Local store point read failed");
                None
            }
        }
    }

    /// Highest id in the collection, 0 when empty or unreadable.
    pub async fn max_id(&self, collection: Collection) -> i64 {
        let sql = format!("SELECT COALESCE(MAX(id), 0) FROM {}", collection.table());
        match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await {
            Ok(max) => max,
            Err(e) => {
                tracing::warn!(error = %e, %collection, "Local store max id read failed");
                0
            }
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new document and return its id. An explicit `id` in the
    /// document is honoured; an existing row with that id is an error.
    pub async fn add(&self, collection: Collection, doc: &Value) -> Result<i64, StoreError> {
        let (id, body) = split_document(doc)?;
        let result = match id {
            Some(id) => {
                let sql = format!("INSERT INTO {} (id, body) VALUES (?, ?)", collection.table());
                sqlx::query(&sql).bind(id).bind(body).execute(&self.pool).await?
            }
            None => {
                let sql = format!("INSERT INTO {} (body) VALUES (?)", collection.table());
                sqlx::query(&sql).bind(body).execute(&self.pool).await?
            }
        };

        Ok(result.last_insert_rowid())
    }

    /// Insert or replace a document by its id.
    pub async fn put(&self, collection: Collection, doc: &Value) -> Result<(), StoreError> {
        let (id, body) = split_document(doc)?;
        let id = id.ok_or(StoreError::MissingId(collection.table()))?;
        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            collection.table()
        );
        sqlx::query(&sql).bind(id).bind(body).execute(&self.pool).await?;

        Ok(())
    }

    /// Upsert several documents in one transaction.
    pub async fn put_many(&self, collection: Collection, docs: &[Value]) -> Result<(), StoreError> {
        let rows = docs
            .iter()
            .map(|doc| {
                let (id, body) = split_document(doc)?;
                Ok((id.ok_or(StoreError::MissingId(collection.table()))?, body))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            collection.table()
        );
        let mut tx = self.pool.begin().await?;
        for (id, body) in rows {
            sqlx::query(&sql).bind(id).bind(body).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn delete(&self, collection: Collection, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn delete_many(&self, collection: Collection, ids: &[i64]) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query(&sql).bind(*id).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Clear the collection and insert `docs`, atomically. Used to mirror a
    /// full remote snapshot. Every document must carry its id.
    pub async fn replace_all(&self, collection: Collection, docs: &[Value]) -> Result<(), StoreError> {
        let rows = docs
            .iter()
            .map(|doc| {
                let (id, body) = split_document(doc)?;
                Ok((id.ok_or(StoreError::MissingId(collection.table()))?, body))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let table = collection.table();
        let insert = format!("INSERT INTO {table} (id, body) VALUES (?, ?)");

        // Rolled back on drop if any statement fails.
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
        for (id, body) in rows {
            sqlx::query(&insert).bind(id).bind(body).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Delete a profile together with every bet assigned to it.
    /// Returns the number of bets removed.
    pub async fn delete_profile_cascade(&self, profile_id: i64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM bets WHERE json_extract(body, '$.profile_id') = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(profile_id, bets_removed = removed, "Profile cascade delete");
        Ok(removed)
    }
}

/// Separate the id from the rest of the document.
fn split_document(doc: &Value) -> Result<(Option<i64>, String), StoreError> {
    let mut doc = doc.clone();
    let id = match doc.as_object_mut() {
        Some(map) => map.remove("id").and_then(|v| v.as_i64()),
        None => None,
    };
    Ok((id, serde_json::to_string(&doc)?))
}

fn document_with_id(collection: Collection, id: i64, body: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut map)) => {
            map.insert("id".into(), Value::from(id));
            Some(Value::Object(map))
        }
        Ok(_) => {
            tracing::warn!(%collection, id, "Skipping stored document that is not an object");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, %collection, id, "Skipping unreadable stored document");
            None
        }
    }
}

fn database_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_document_strips_id() {
        let (id, body) = split_document(&json!({"id": 4, "name": "x"})).unwrap();
        assert_eq!(id, Some(4));
        assert_eq!(body, r#"{"name":"x"}"#);

        let (id, _) = split_document(&json!({"name": "x"})).unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn test_document_with_id_injects_column() {
        let doc = document_with_id(Collection::Bets, 9, r#"{"amount":1}"#).unwrap();
        assert_eq!(doc["id"], 9);
        assert_eq!(doc["amount"], 1);

        assert!(document_with_id(Collection::Bets, 9, "[1,2]").is_none());
        assert!(document_with_id(Collection::Bets, 9, "not json").is_none());
    }

    #[test]
    fn test_database_files_include_wal_sidecars() {
        let files = database_files(Path::new("/tmp/tracker.db"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/tmp/tracker.db"),
                PathBuf::from("/tmp/tracker.db-wal"),
                PathBuf::from("/tmp/tracker.db-shm"),
            ]
        );
    }
}

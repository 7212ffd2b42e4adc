use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::ids::LocalIdGenerator;
use super::mirror::MirrorHandle;
use super::notifier::{format_cached_warning, Notifier};
use super::record::{normalize_rows, sort_newest_first, Record};
use super::snapshot::Snapshot;
use crate::db::LocalStore;
use crate::errors::TrackerError;
use crate::metrics;
use crate::remote::{RemoteClient, RemoteError};

/// Everything a repository talks to. Shared by the bet and profile
/// repositories of one tracker.
#[derive(Debug, Clone)]
pub(crate) struct Backends {
    /// `None` in local-only mode; fixed for the tracker's lifetime.
    pub remote: Option<RemoteClient>,
    pub store: LocalStore,
    pub mirror: MirrorHandle,
    pub online: Arc<AtomicBool>,
    pub notifier: Notifier,
}

impl Backends {
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Where a write should go: the remote, or the local store (`None`).
    /// Writes against a configured remote that is offline are refused rather
    /// than staged locally.
    pub fn write_target(&self) -> Result<Option<&RemoteClient>, TrackerError> {
        match &self.remote {
            Some(_) if !self.is_online() => Err(TrackerError::Offline),
            Some(remote) => Ok(Some(remote)),
            None => Ok(None),
        }
    }
}

/// Log and count a failed remote write, handing the error back to the caller.
pub(crate) fn remote_write_failed(op: &'static str, table: &str, e: RemoteError) -> TrackerError {
    tracing::warn!(error = %e, op, table, "Remote write failed");
    metrics::remote_failure("write");
    TrackerError::Remote(e)
}

/// Per-collection persistence: the in-memory snapshot plus the
/// remote-or-local branching for every operation.
#[derive(Debug)]
pub(crate) struct Repository<R: Record> {
    snapshot: Snapshot<R>,
    ids: LocalIdGenerator,
}

impl<R: Record> Repository<R> {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::new(),
            ids: LocalIdGenerator::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot<R> {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot<R> {
        &mut self.snapshot
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// List records newest-first. Never fails: remote trouble degrades to the
    /// local copy with a warning notice.
    pub async fn list(&mut self, b: &Backends, filter: &R::Filter) -> Vec<R> {
        let table = R::COLLECTION.table();

        let Some(remote) = &b.remote else {
            let rows = normalize_rows::<R>(b.store.get_all(R::COLLECTION).await);
            self.snapshot.replace(rows);
            return self.snapshot.filtered(filter);
        };

        if !b.is_online() {
            tracing::debug!(table, "Offline, serving local copy");
            return self.fallback(b, filter, "offline").await;
        }

        match remote.list(table, &R::remote_filters(filter)).await {
            Ok(rows) => {
                let mut records = normalize_rows::<R>(rows);
                sort_newest_first(&mut records);
                let docs: Vec<Value> = records.iter().map(Record::to_wire).collect();

                if R::is_unfiltered(filter) {
                    b.mirror.replace_all(R::COLLECTION, docs);
                    self.snapshot.replace(records.clone());
                } else {
                    // A filtered listing only speaks for its own slice.
                    b.mirror.upsert(R::COLLECTION, docs);
                    let vanished = self.snapshot.merge_slice(filter, records.clone());
                    b.mirror.delete(R::COLLECTION, vanished);
                }

                tracing::debug!(table, rows = records.len(), "Remote list");
                records
            }
            Err(e) => {
                tracing::warn!(error = %e, table, "Remote list failed, serving local copy");
                metrics::remote_failure("list");
                self.fallback(b, filter, &e.to_string()).await
            }
        }
    }

    /// Best available local data for `filter`, with one warning notice.
    async fn fallback(&mut self, b: &Backends, filter: &R::Filter, reason: &str) -> Vec<R> {
        let table = R::COLLECTION.table();
        metrics::cache_fallback(table);
        b.notifier.warn(format_cached_warning(table, reason));

        if !self.snapshot.is_complete() {
            // Let queued mirror writes land before reading the local copy.
            b.mirror.flush().await;
            let rows = normalize_rows::<R>(b.store.get_all(R::COLLECTION).await);
            self.snapshot.replace(rows);
        }
        self.snapshot.filtered(filter)
    }

    /// Snapshot first, then the authoritative backend.
    pub async fn get(&mut self, b: &Backends, id: i64) -> Option<R> {
        if let Some(record) = self.snapshot.find(id) {
            return Some(record.clone());
        }

        let table = R::COLLECTION.table();
        if let Some(remote) = b.remote.as_ref().filter(|_| b.is_online()) {
            match remote.get_by_id(table, id).await {
                Ok(row) => {
                    let record = row.as_ref().and_then(R::from_wire);
                    if let Some(record) = &record {
                        b.mirror.upsert(R::COLLECTION, vec![record.to_wire()]);
                    }
                    return record;
                }
                Err(e) => {
                    tracing::warn!(error = %e, table, id, "Remote point read failed, trying local copy");
                    metrics::remote_failure("get");
                    metrics::cache_fallback(table);
                    b.notifier.warn(format_cached_warning(table, &e.to_string()));
                    b.mirror.flush().await;
                }
            }
        }

        b.store
            .get_by_id(R::COLLECTION, id)
            .await
            .as_ref()
            .and_then(R::from_wire)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Persist a new record. The id on `record` is ignored.
    pub async fn create(&mut self, b: &Backends, mut record: R) -> Result<R, TrackerError> {
        let table = R::COLLECTION.table();

        let created = match b.write_target()? {
            Some(remote) => {
                let mut wire = record.to_wire();
                if let Some(map) = wire.as_object_mut() {
                    map.remove("id");
                }
                let row = remote
                    .create(table, &wire)
                    .await
                    .map_err(|e| remote_write_failed("create", table, e))?;
                let created = R::from_wire(&row).ok_or_else(|| {
                    TrackerError::Remote(RemoteError::Unexpected(format!(
                        "new {table} row came back without an id"
                    )))
                })?;
                b.mirror.upsert(R::COLLECTION, vec![created.to_wire()]);
                created
            }
            None => {
                let floor = self
                    .snapshot
                    .max_id()
                    .max(b.store.max_id(R::COLLECTION).await);
                record.set_id(self.ids.next(floor));
                b.store.add(R::COLLECTION, &record.to_wire()).await?;
                record
            }
        };

        tracing::info!(table, id = created.id(), "Record created");
        self.snapshot.prepend(created.clone());
        Ok(created)
    }

    /// Replace an existing record. Immutable fields are never sent.
    pub async fn update(&mut self, b: &Backends, record: R) -> Result<R, TrackerError> {
        let table = R::COLLECTION.table();
        let id = record.id();

        let updated = match b.write_target()? {
            Some(remote) => {
                let mut partial = record.to_wire();
                if let Some(map) = partial.as_object_mut() {
                    map.remove("id");
                    for field in R::IMMUTABLE_FIELDS {
                        map.remove(*field);
                    }
                }
                let row = remote.update(table, id, &partial).await.map_err(|e| match e {
                    RemoteError::NoMatch { .. } => {
                        TrackerError::NotFound(format!("{table} {id}"))
                    }
                    e => remote_write_failed("update", table, e),
                })?;
                let updated = row.as_ref().and_then(R::from_wire).unwrap_or(record);
                b.mirror.upsert(R::COLLECTION, vec![updated.to_wire()]);
                updated
            }
            None => {
                b.store.put(R::COLLECTION, &record.to_wire()).await?;
                record
            }
        };

        tracing::info!(table, id, "Record updated");
        self.snapshot.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn remove(&mut self, b: &Backends, id: i64) -> Result<(), TrackerError> {
        let table = R::COLLECTION.table();

        match b.write_target()? {
            Some(remote) => {
                remote
                    .delete(table, id)
                    .await
                    .map_err(|e| remote_write_failed("delete", table, e))?;
                b.mirror.delete(R::COLLECTION, vec![id]);
            }
            None => b.store.delete(R::COLLECTION, id).await?,
        }

        tracing::info!(table, id, "Record deleted");
        self.snapshot.remove(id);
        Ok(())
    }
}

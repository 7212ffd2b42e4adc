use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::db::{Collection, LocalStore, StoreError};
use crate::metrics;

/// A write to apply to the local copy of confirmed remote state.
#[derive(Debug)]
enum MirrorOp {
    ReplaceAll {
        collection: Collection,
        docs: Vec<Value>,
    },
    Upsert {
        collection: Collection,
        docs: Vec<Value>,
    },
    Delete {
        collection: Collection,
        ids: Vec<i64>,
    },
    CascadeProfile(i64),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background task that mirrors remote state into the local
/// store. Enqueueing never blocks the caller; operations apply in order.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    tx: mpsc::UnboundedSender<MirrorOp>,
}

/// Spawn the mirror task. Must be called inside a Tokio runtime.
pub fn spawn_mirror(store: LocalStore) -> MirrorHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_mirror(rx, store));
    MirrorHandle { tx }
}

impl MirrorHandle {
    pub fn replace_all(&self, collection: Collection, docs: Vec<Value>) {
        self.enqueue(MirrorOp::ReplaceAll { collection, docs });
    }

    pub fn upsert(&self, collection: Collection, docs: Vec<Value>) {
        if !docs.is_empty() {
            self.enqueue(MirrorOp::Upsert { collection, docs });
        }
    }

    pub fn delete(&self, collection: Collection, ids: Vec<i64>) {
        if !ids.is_empty() {
            self.enqueue(MirrorOp::Delete { collection, ids });
        }
    }

    pub fn cascade_profile(&self, profile_id: i64) {
        self.enqueue(MirrorOp::CascadeProfile(profile_id));
    }

    /// Wait until every operation enqueued so far has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(MirrorOp::Flush(done_tx));
        let _ = done_rx.await;
    }

    fn enqueue(&self, op: MirrorOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("Mirror task has stopped; local copy will lag behind");
            metrics::mirror_write_failure();
        }
    }
}

async fn run_mirror(mut rx: mpsc::UnboundedReceiver<MirrorOp>, store: LocalStore) {
    while let Some(op) = rx.recv().await {
        let (label, result): (&str, Result<(), StoreError>) = match op {
            MirrorOp::ReplaceAll { collection, docs } => {
                tracing::debug!(%collection, rows = docs.len(), "Mirroring full snapshot");
                ("replace_all", store.replace_all(collection, &docs).await)
            }
            MirrorOp::Upsert { collection, docs } => {
                ("upsert", store.put_many(collection, &docs).await)
            }
            MirrorOp::Delete { collection, ids } => {
                ("delete", store.delete_many(collection, &ids).await)
            }
            MirrorOp::CascadeProfile(profile_id) => (
                "cascade_profile",
                store.delete_profile_cascade(profile_id).await.map(|_| ()),
            ),
            MirrorOp::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, op = label, "Mirror write failed");
            metrics::mirror_write_failure();
        }
    }
    tracing::debug!("Mirror channel closed");
}

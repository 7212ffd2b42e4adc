pub mod local_store;
pub mod schema;

pub use local_store::LocalStore;

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local store failed to open: {0}")]
    Open(#[source] sqlx::Error),

    #[error("local store query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("stored document is not valid JSON: {0}")]
    Document(#[from] serde_json::Error),

    #[error("record has no id: {0}")]
    MissingId(&'static str),

    #[error("local store files could not be removed: {0}")]
    Io(#[from] std::io::Error),
}

/// Named collections in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bets,
    Profiles,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Bets, Collection::Profiles];

    /// Table name, shared by the local store and the remote backend.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Bets => "bets",
            Collection::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

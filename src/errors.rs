use crate::db::StoreError;
use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote backend is offline; the change was not saved")]
    Offline,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TrackerError {
    /// True for failures the user can fix by editing the input.
    pub fn is_validation(&self) -> bool {
        matches!(self, TrackerError::Validation(_))
    }
}

impl From<tokio::task::JoinError> for TrackerError {
    fn from(e: tokio::task::JoinError) -> Self {
        TrackerError::Internal(e.into())
    }
}

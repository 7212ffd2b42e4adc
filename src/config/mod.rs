use std::env;
use std::path::PathBuf;

/// Placeholder shipped in `.env.example`; leaving it in place selects local-only mode.
pub const REMOTE_URL_PLACEHOLDER: &str = "YOUR_REMOTE_URL";
pub const REMOTE_API_KEY_PLACEHOLDER: &str = "YOUR_REMOTE_API_KEY";

const DEFAULT_STORE_PATH: &str = "bettracker.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Remote REST backend (optional, placeholders mean local-only mode)
    pub remote_url: String,
    pub remote_api_key: String,

    // Local offline store
    pub store_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_path = env::var("BETTRACKER_STORE_PATH")
            .unwrap_or_else(|_| DEFAULT_STORE_PATH.into());
        if store_path.trim().is_empty() {
            anyhow::bail!("BETTRACKER_STORE_PATH must not be empty");
        }

        Ok(Self {
            remote_url: env::var("BETTRACKER_REMOTE_URL")
                .unwrap_or_else(|_| REMOTE_URL_PLACEHOLDER.into()),
            remote_api_key: env::var("BETTRACKER_REMOTE_API_KEY")
                .unwrap_or_else(|_| REMOTE_API_KEY_PLACEHOLDER.into()),
            store_path: PathBuf::from(store_path),
        })
    }

    /// Config for a tracker that never talks to a remote backend.
    pub fn local_only(store_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_url: REMOTE_URL_PLACEHOLDER.into(),
            remote_api_key: REMOTE_API_KEY_PLACEHOLDER.into(),
            store_path: store_path.into(),
        }
    }

    /// Returns true if both remote values are filled in with real settings.
    pub fn is_remote_configured(&self) -> bool {
        let url = self.remote_url.trim();
        let key = self.remote_api_key.trim();

        !url.is_empty()
            && !key.is_empty()
            && url != REMOTE_URL_PLACEHOLDER
            && key != REMOTE_API_KEY_PLACEHOLDER
            && (url.starts_with("http://") || url.starts_with("https://"))
    }
}

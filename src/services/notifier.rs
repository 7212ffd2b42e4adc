use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// User-facing message from the tracker, e.g. "showing cached data".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Broadcast channel for non-fatal notices. Sending never fails the caller:
/// with no subscribers the notice is simply dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Warning, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Info, message.into());
    }

    fn send(&self, level: NoticeLevel, message: String) {
        tracing::debug!(?level, %message, "Notice");
        let _ = self.tx.send(Notice { level, message });
    }
}

/// Warning shown when a read is served from the local copy.
pub fn format_cached_warning(collection: &str, reason: &str) -> String {
    format!("Server unavailable ({reason}); showing saved {collection}")
}

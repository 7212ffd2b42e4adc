use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::TrackerError;

pub const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

/// Raw receipt photo as picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Receipt {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Encode a receipt as a `data:` URL.
///
/// Runs on a blocking thread and must finish before the save touches any
/// store, so no storage transaction is ever held open across it.
pub async fn encode_receipt(receipt: Receipt) -> Result<String, TrackerError> {
    let content_type = receipt.content_type.trim().to_lowercase();
    if !content_type.starts_with("image/") {
        return Err(TrackerError::Validation(format!(
            "receipt must be an image, got {content_type:?}"
        )));
    }
    if receipt.bytes.is_empty() {
        return Err(TrackerError::Validation("receipt image is empty".into()));
    }
    if receipt.bytes.len() > MAX_RECEIPT_BYTES {
        return Err(TrackerError::Validation(format!(
            "receipt image is {} bytes, limit is {MAX_RECEIPT_BYTES}",
            receipt.bytes.len()
        )));
    }

    let encoded = tokio::task::spawn_blocking(move || STANDARD.encode(&receipt.bytes)).await?;
    Ok(format!("data:{content_type};base64,{encoded}"))
}

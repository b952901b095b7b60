use common::new_id;
use common::storage::{BlobStore, MediaRecord};
use tracing::{instrument, warn};

use super::normalize::{NORMALIZED_MIME_TYPE, NormalizeOptions, normalize};
use crate::error::{JournalError, Result};

/// A file handed over by the capture or file-picker layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// A freshly stored MediaRecord, ready to be attached to an owning record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedMedia {
    pub media_id: String,
    pub mime_type: String,
    pub size: u64,
}

/// Store one upload under a fresh id.
///
/// Images are normalized on a blocking thread, videos are stored verbatim and
/// anything else is rejected.
pub async fn ingest(
    store: &dyn BlobStore,
    upload: Upload,
    options: NormalizeOptions,
) -> Result<IngestedMedia> {
    let (mime_type, bytes) = if upload.mime_type.starts_with("image") {
        let input = upload.bytes;
        let normalized = tokio::task::spawn_blocking(move || normalize(&input, options))
            .await
            .map_err(|e| JournalError::Internal(format!("normalization task failed: {e}")))??;
        (NORMALIZED_MIME_TYPE.to_string(), normalized.bytes)
    } else if upload.mime_type.starts_with("video") {
        (upload.mime_type, upload.bytes)
    } else {
        return Err(JournalError::Decode(format!(
            "unsupported media type '{}' for {}",
            upload.mime_type, upload.file_name
        )));
    };

    let record = MediaRecord::new(new_id(), mime_type, bytes);
    let ingested = IngestedMedia {
        media_id: record.id.clone(),
        mime_type: record.mime_type.clone(),
        size: record.size(),
    };
    store.put(record).await?;
    Ok(ingested)
}

/// Store several uploads. A failing file does not stop the rest.
///
/// Returns one result per upload, in input order.
#[instrument(skip(store, uploads), fields(files = uploads.len()))]
pub async fn ingest_batch(
    store: &dyn BlobStore,
    uploads: Vec<Upload>,
    options: NormalizeOptions,
) -> Vec<Result<IngestedMedia>> {
    let mut results = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let file_name = upload.file_name.clone();
        let result = ingest(store, upload, options).await;
        if let Err(e) = &result {
            warn!(file = %file_name, error = %e, "Upload rejected");
        }
        results.push(result);
    }
    results
}

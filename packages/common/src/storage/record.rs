use serde::{Deserialize, Serialize};

/// A binary attachment held by the blob store.
///
/// Records are immutable once stored. Replacing a photo creates a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    /// Store key. Opaque.
    pub id: String,
    /// MIME type of `bytes` (e.g. `image/jpeg`, `video/mp4`).
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl MediaRecord {
    /// Build a record stamped with the current time.
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            bytes,
            created_at: crate::ids::now_millis(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn meta(&self) -> MediaMeta {
        MediaMeta {
            id: self.id.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size(),
            created_at: self.created_at,
        }
    }
}

/// Record metadata without the payload, as returned by `BlobStore::list_meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    pub id: String,
    pub mime_type: String,
    pub size: u64,
    pub created_at: i64,
}

use async_trait::async_trait;

use super::error::StorageError;
use super::record::{MediaMeta, MediaRecord};

/// Keyed binary storage for media attachments.
///
/// Ids are opaque and chosen by the caller. Payloads are never interpreted.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a record, overwriting any record with the same id.
    async fn put(&self, record: MediaRecord) -> Result<(), StorageError>;

    /// Fetch a record. A missing id is `Ok(None)`, not an error.
    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError>;

    /// Delete a record by id.
    ///
    /// Returns `true` if the record was deleted, `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// Ids of every stored record.
    async fn list_ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .list_meta()
            .await?
            .into_iter()
            .map(|meta| meta.id)
            .collect())
    }

    /// Metadata of every stored record, ordered by creation time then id.
    async fn list_meta(&self) -> Result<Vec<MediaMeta>, StorageError>;

    /// Remove every record.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Check whether a record exists.
    async fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Keyed text documents holding the owning-record collections.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the document stored under `key`, if any.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the document stored under `key`. Missing keys are ignored.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Sort metadata the way `list_meta` promises.
pub(crate) fn sort_meta(metas: &mut [MediaMeta]) {
    metas.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// State keys are internal constants; reject anything that is not a plain name.
pub(crate) fn validate_state_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Unavailable(format!("invalid state key '{key}'")))
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::StorageError;
use super::record::{MediaMeta, MediaRecord};
use super::traits::{BlobStore, StateStore, sort_meta, validate_state_key};

/// In-process blob store.
///
/// Holds records for the lifetime of the value. It can be switched offline to
/// reproduce an unavailable storage engine.
#[derive(Default)]
pub struct MemoryBlobStore {
    records: RwLock<HashMap<String, MediaRecord>>,
    quota: Option<u64>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail with `StorageError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, record: MediaRecord) -> Result<(), StorageError> {
        self.ensure_online()?;
        let mut records = self.records.write().await;

        if let Some(limit) = self.quota {
            let used: u64 = records.values().map(MediaRecord::size).sum();
            let replaced = records.get(&record.id).map(MediaRecord::size).unwrap_or(0);
            let needed = used.saturating_sub(replaced) + record.size();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }

        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError> {
        self.ensure_online()?;
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.ensure_online()?;
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn list_meta(&self) -> Result<Vec<MediaMeta>, StorageError> {
        self.ensure_online()?;
        let mut metas: Vec<MediaMeta> = self
            .records
            .read()
            .await
            .values()
            .map(MediaRecord::meta)
            .collect();
        sort_meta(&mut metas);
        Ok(metas)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.ensure_online()?;
        self.records.write().await.clear();
        Ok(())
    }
}

/// In-process state documents.
#[derive(Default)]
pub struct MemoryStateStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_state_key(key)?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_state_key(key)?;
        self.documents
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_state_key(key)?;
        self.documents.write().await.remove(key);
        Ok(())
    }
}

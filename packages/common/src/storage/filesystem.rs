use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::StorageError;
use super::key::StorageKey;
use super::record::{MediaMeta, MediaRecord};
use super::traits::{BlobStore, StateStore, sort_meta, validate_state_key};

const TMP_DIR: &str = ".tmp";

/// Filesystem-backed media blob store.
///
/// Records are stored in a Git-style sharded layout keyed by the SHA-256 of
/// the record id:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}.bin` holds the
/// payload and the sibling `.json` file holds the [`MediaMeta`]. The meta file
/// is written last, so a record is listed only once both halves exist.
///
/// With a quota set, the payload total is read from disk once and then kept
/// current by `put`, `delete` and `clear`. Writers serialize on it.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    quota: Option<u64>,
    usage: Mutex<Option<u64>>,
}

impl FilesystemBlobStore {
    /// Open (or create) a blob store rooted at `base_path`.
    ///
    /// `quota` caps the total payload bytes the store will hold.
    pub async fn new(base_path: PathBuf, quota: Option<u64>) -> Result<Self, StorageError> {
        for dir in [base_path.clone(), base_path.join(TMP_DIR)] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::Unavailable(format!("cannot open {}: {e}", dir.display()))
            })?;
        }
        Ok(Self {
            base_path,
            quota,
            usage: Mutex::new(None),
        })
    }

    fn data_path(&self, key: &StorageKey) -> PathBuf {
        self.base_path
            .join(key.shard_prefix())
            .join(format!("{}.bin", key.shard_suffix()))
    }

    fn meta_path(&self, key: &StorageKey) -> PathBuf {
        self.base_path
            .join(key.shard_prefix())
            .join(format!("{}.json", key.shard_suffix()))
    }

    async fn read_meta(&self, key: &StorageKey) -> Result<Option<MediaMeta>, StorageError> {
        match fs::read(self.meta_path(key)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn stored_size(&self, key: &StorageKey) -> Result<u64, StorageError> {
        Ok(self.read_meta(key).await?.map(|meta| meta.size).unwrap_or(0))
    }

    /// Payload bytes held once `record` is written, checked against the quota.
    async fn usage_after_put(
        &self,
        usage: &mut Option<u64>,
        key: &StorageKey,
        record: &MediaRecord,
    ) -> Result<Option<u64>, StorageError> {
        let Some(limit) = self.quota else {
            return Ok(None);
        };
        let used = match *usage {
            Some(used) => used,
            None => {
                let used = self.list_meta().await?.iter().map(|meta| meta.size).sum();
                *usage = Some(used);
                used
            }
        };
        let replaced = self.stored_size(key).await?;
        let needed = used.saturating_sub(replaced) + record.size();
        if needed > limit {
            return Err(StorageError::QuotaExceeded { needed, limit });
        }
        Ok(Some(needed))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, record: MediaRecord) -> Result<(), StorageError> {
        let key = StorageKey::for_id(&record.id);
        let mut usage = self.usage.lock().await;
        let after = self.usage_after_put(&mut usage, &key, &record).await?;

        let meta = serde_json::to_vec(&record.meta())?;
        let tmp_dir = self.base_path.join(TMP_DIR);

        write_atomic(&tmp_dir, &self.data_path(&key), &record.bytes).await?;
        write_atomic(&tmp_dir, &self.meta_path(&key), &meta).await?;
        if after.is_some() {
            *usage = after;
        }

        debug!(media_id = %record.id, size = record.size(), "Stored media record");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError> {
        let key = StorageKey::for_id(id);
        let Some(meta) = self.read_meta(&key).await? else {
            return Ok(None);
        };

        match fs::read(self.data_path(&key)).await {
            Ok(bytes) => Ok(Some(MediaRecord {
                id: meta.id,
                mime_type: meta.mime_type,
                bytes,
                created_at: meta.created_at,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let key = StorageKey::for_id(id);
        let mut usage = self.usage.lock().await;
        let size = match *usage {
            Some(_) => self.stored_size(&key).await?,
            None => 0,
        };
        let existed = match fs::remove_file(self.meta_path(&key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(self.data_path(&key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(used) = usage.as_mut() {
            *used = used.saturating_sub(size);
        }
        Ok(existed)
    }

    async fn list_meta(&self) -> Result<Vec<MediaMeta>, StorageError> {
        let mut metas = Vec::new();
        let mut shards = fs::read_dir(&self.base_path).await?;

        while let Some(shard) = shards.next_entry().await? {
            if shard.file_name() == TMP_DIR || !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let raw = fs::read(&path).await?;
                metas.push(serde_json::from_slice(&raw)?);
            }
        }

        sort_meta(&mut metas);
        Ok(metas)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut usage = self.usage.lock().await;
        // Unknown until rescanned if a removal fails partway.
        *usage = None;
        let mut shards = fs::read_dir(&self.base_path).await?;
        while let Some(shard) = shards.next_entry().await? {
            if shard.file_name() == TMP_DIR || !shard.file_type().await?.is_dir() {
                continue;
            }
            fs::remove_dir_all(shard.path()).await?;
        }
        if self.quota.is_some() {
            *usage = Some(0);
        }
        debug!(base_path = %self.base_path.display(), "Cleared media store");
        Ok(())
    }
}

/// Filesystem-backed state documents: `{base_path}/{key}.json`.
pub struct FilesystemStateStore {
    base_path: PathBuf,
}

impl FilesystemStateStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        for dir in [base_path.clone(), base_path.join(TMP_DIR)] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::Unavailable(format!("cannot open {}: {e}", dir.display()))
            })?;
        }
        Ok(Self { base_path })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StateStore for FilesystemStateStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_state_key(key)?;
        match fs::read_to_string(self.document_path(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_state_key(key)?;
        write_atomic(
            &self.base_path.join(TMP_DIR),
            &self.document_path(key),
            value.as_bytes(),
        )
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_state_key(key)?;
        match fs::remove_file(self.document_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write through a temp file and rename into place.
async fn write_atomic(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<(), StorageError> {
    let temp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());
    if let Err(e) = fs::write(&temp_path, data).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    if let Err(e) = fs::rename(&temp_path, target).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

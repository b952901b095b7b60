//! Display handles for stored media.
//!
//! Resolving a reference produces a handle that keeps the bytes alive while a
//! view shows them. Handles are shared per media id and must be released.

use std::sync::Arc;

use common::storage::{BlobStore, StorageError};
use dashmap::DashMap;
use tracing::debug;

use super::reference::MediaRef;

/// A resolved, displayable media record.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    pub media_id: String,
    pub mime_type: String,
    /// Opaque URL identifying this handle, unique per cache entry.
    pub url: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug)]
struct CachedHandle {
    handle: DisplayHandle,
    viewers: usize,
}

/// Process-wide cache of outstanding display handles keyed by media id.
#[derive(Debug, Default)]
pub struct HandleCache {
    entries: DashMap<String, CachedHandle>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a reference into a display handle.
    ///
    /// Returns `None` when the reference has no stored form or its record is
    /// gone; the caller renders that as an empty slot. Each successful call
    /// must be paired with one [`HandleCache::release`].
    pub async fn resolve(
        &self,
        store: &dyn BlobStore,
        media_ref: &MediaRef,
    ) -> Result<Option<DisplayHandle>, StorageError> {
        let Some(media_id) = media_ref.media_id() else {
            return Ok(None);
        };
        self.resolve_id(store, media_id).await
    }

    /// Resolve a media id directly (progress photo slots hold bare ids).
    pub async fn resolve_id(
        &self,
        store: &dyn BlobStore,
        media_id: &str,
    ) -> Result<Option<DisplayHandle>, StorageError> {
        if let Some(mut cached) = self.entries.get_mut(media_id) {
            cached.viewers += 1;
            return Ok(Some(cached.handle.clone()));
        }

        let Some(record) = store.get(media_id).await? else {
            return Ok(None);
        };

        let mut entry = self
            .entries
            .entry(media_id.to_string())
            .or_insert_with(|| CachedHandle {
                handle: DisplayHandle {
                    media_id: record.id.clone(),
                    mime_type: record.mime_type.clone(),
                    url: format!("blob:fitlog/{}", uuid::Uuid::new_v4()),
                    bytes: Arc::from(record.bytes),
                },
                viewers: 0,
            });
        entry.viewers += 1;
        debug!(media_id, viewers = entry.viewers, "Display handle acquired");
        Ok(Some(entry.handle.clone()))
    }

    /// Release one viewer of `media_id`. The handle is revoked with its last viewer.
    ///
    /// Returns `true` if the handle was revoked.
    pub fn release(&self, media_id: &str) -> bool {
        let revoked = self
            .entries
            .remove_if_mut(media_id, |_, cached| {
                cached.viewers = cached.viewers.saturating_sub(1);
                cached.viewers == 0
            })
            .is_some();
        if revoked {
            debug!(media_id, "Display handle revoked");
        }
        revoked
    }

    /// Revoke a handle regardless of viewers, e.g. after its record was deleted.
    pub fn evict(&self, media_id: &str) -> bool {
        self.entries.remove(media_id).is_some()
    }

    /// Revoke every outstanding handle. Returns how many were revoked.
    pub fn release_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Number of outstanding handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Reclamation of media records no owning record references.

use common::storage::{BlobStore, MediaMeta, StorageError};
use serde::Serialize;
use tracing::{info, instrument};

use crate::model::Dataset;
use crate::usage::collect_live_media_ids;

/// Record count and payload bytes of a blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub count: usize,
    pub bytes: u64,
}

impl StoreStats {
    pub fn from_meta<'a>(metas: impl IntoIterator<Item = &'a MediaMeta>) -> Self {
        metas.into_iter().fold(Self::default(), |acc, meta| Self {
            count: acc.count + 1,
            bytes: acc.bytes + meta.size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimReport {
    pub unused_count: usize,
    pub before: StoreStats,
    /// Projected when `dry_run` is set, measured otherwise.
    pub after: StoreStats,
    pub dry_run: bool,
    /// Ids that were (or would be) deleted.
    pub unused_ids: Vec<String>,
}

impl ReclaimReport {
    pub fn freed_bytes(&self) -> u64 {
        self.before.bytes.saturating_sub(self.after.bytes)
    }
}

pub async fn store_stats(store: &dyn BlobStore) -> Result<StoreStats, StorageError> {
    Ok(StoreStats::from_meta(&store.list_meta().await?))
}

/// Delete every record that `dataset` does not reference.
///
/// With `dry_run` nothing is deleted and `after` is a projection.
#[instrument(skip(store, dataset))]
pub async fn reclaim_unused(
    store: &dyn BlobStore,
    dataset: &Dataset,
    dry_run: bool,
) -> Result<ReclaimReport, StorageError> {
    let live = collect_live_media_ids(dataset);
    let metas = store.list_meta().await?;
    let before = StoreStats::from_meta(&metas);

    let (unused, kept): (Vec<&MediaMeta>, Vec<&MediaMeta>) =
        metas.iter().partition(|meta| !live.contains(&meta.id));
    let unused_ids: Vec<String> = unused.iter().map(|meta| meta.id.clone()).collect();

    let after = if dry_run {
        StoreStats::from_meta(kept)
    } else {
        for id in &unused_ids {
            store.delete(id).await?;
        }
        store_stats(store).await?
    };

    info!(
        unused = unused_ids.len(),
        before_bytes = before.bytes,
        after_bytes = after.bytes,
        dry_run,
        "Unused media reclamation finished"
    );

    Ok(ReclaimReport {
        unused_count: unused_ids.len(),
        before,
        after,
        dry_run,
        unused_ids,
    })
}

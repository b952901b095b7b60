use std::collections::HashSet;

use crate::media::reference::MediaRef;
use crate::model::Dataset;

/// Every media id referenced by any owning record.
///
/// Inline legacy entries and empty photo slots contribute nothing.
pub fn collect_live_media_ids(dataset: &Dataset) -> HashSet<String> {
    let referenced = dataset
        .media_lists()
        .flat_map(|media| media.iter().filter_map(MediaRef::media_id));
    let photos = dataset.progress.iter().flat_map(|p| p.photos.ids());

    referenced.chain(photos).map(str::to_string).collect()
}

/// How many references, across all owning records, point at `media_id`.
pub fn count_media_usage(dataset: &Dataset, media_id: &str) -> usize {
    let referenced = dataset
        .media_lists()
        .flat_map(|media| media.iter())
        .filter(|m| m.media_id() == Some(media_id))
        .count();
    let photos = dataset
        .progress
        .iter()
        .flat_map(|p| p.photos.ids())
        .filter(|id| *id == media_id)
        .count();
    referenced + photos
}

//! Referential integrity report over a dataset and its blob store.

use std::collections::HashSet;

use common::storage::{BlobStore, StorageError};
use serde::Serialize;

use crate::model::Dataset;

/// Which kind of record holds a broken link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Exercise,
    Meal,
    Progress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingMedia {
    pub owner: OwnerKind,
    pub owner_id: String,
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanChild {
    pub owner: OwnerKind,
    pub child_id: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub dangling_media: Vec<DanglingMedia>,
    pub orphan_children: Vec<OrphanChild>,
    /// Legacy entries still carrying inline bytes.
    pub inline_entries: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_media.is_empty() && self.orphan_children.is_empty() && self.inline_entries == 0
    }
}

/// Find media references without a record and children without a parent.
///
/// Children with no parent id at all are not reported.
pub async fn check_integrity(
    store: &dyn BlobStore,
    dataset: &Dataset,
) -> Result<IntegrityReport, StorageError> {
    let stored: HashSet<String> = store.list_ids().await?.into_iter().collect();
    let mut report = IntegrityReport::default();

    let mut check = |owner: OwnerKind, owner_id: &str, media_id: &str| {
        if !stored.contains(media_id) {
            report.dangling_media.push(DanglingMedia {
                owner,
                owner_id: owner_id.to_string(),
                media_id: media_id.to_string(),
            });
        }
    };

    let mut inline_entries = 0;
    for exercise in &dataset.exercises {
        for media_ref in &exercise.media {
            match media_ref.media_id() {
                Some(id) => check(OwnerKind::Exercise, &exercise.id, id),
                None => inline_entries += 1,
            }
        }
    }
    for meal in &dataset.meals {
        for media_ref in &meal.media {
            match media_ref.media_id() {
                Some(id) => check(OwnerKind::Meal, &meal.id, id),
                None => inline_entries += 1,
            }
        }
    }
    for entry in &dataset.progress {
        for id in entry.photos.ids() {
            check(OwnerKind::Progress, &entry.id, id);
        }
    }
    report.inline_entries = inline_entries;

    let day_ids: HashSet<&str> = dataset.days.iter().map(|d| d.id.as_str()).collect();
    for exercise in &dataset.exercises {
        if let Some(day_id) = exercise.day_id.as_deref().filter(|id| !day_ids.contains(id)) {
            report.orphan_children.push(OrphanChild {
                owner: OwnerKind::Exercise,
                child_id: exercise.id.clone(),
                parent_id: day_id.to_string(),
            });
        }
    }
    let type_ids: HashSet<&str> = dataset.meal_types.iter().map(|t| t.id.as_str()).collect();
    for meal in &dataset.meals {
        if let Some(type_id) = meal.meal_type_id.as_deref().filter(|id| !type_ids.contains(id)) {
            report.orphan_children.push(OrphanChild {
                owner: OwnerKind::Meal,
                child_id: meal.id.clone(),
                parent_id: type_id.to_string(),
            });
        }
    }

    Ok(report)
}

use chrono::{NaiveDate, SecondsFormat, Utc};
use common::storage::{BlobStore, StorageError};
use tracing::{info, instrument};

use super::Scope;
use super::document::{
    ExportData, ExportDocument, FoodSection, MediaSection, MediaStoreDump, ProgressSection,
    TrainSection,
};
use crate::model::Dataset;

/// Snapshot the collections in `scope`, plus every media record when
/// `include_media` is set. Nothing is mutated.
#[instrument(skip(store, dataset, app_name))]
pub async fn build_export_payload(
    store: &dyn BlobStore,
    dataset: &Dataset,
    scope: Scope,
    include_media: bool,
    app_name: &str,
) -> Result<ExportDocument, StorageError> {
    let mut data = ExportData::default();

    if scope.includes_train() {
        data.train = Some(TrainSection {
            days: dataset.days.clone(),
            exercises: dataset.exercises.clone(),
        });
    }
    if scope.includes_food() {
        data.food = Some(FoodSection {
            mealtypes: dataset.meal_types.clone(),
            meals: dataset.meals.clone(),
        });
    }
    if scope.includes_progress() {
        data.progress = Some(ProgressSection {
            records: dataset.progress.clone(),
        });
    }

    if include_media {
        let mut records = Vec::new();
        for id in store.list_ids().await? {
            // Listed ids can vanish if the store is edited underneath us.
            if let Some(record) = store.get(&id).await? {
                records.push(record);
            }
        }
        info!(records = records.len(), "Media store included in export");
        data.media = Some(MediaSection {
            store: MediaStoreDump::from_records(&records),
        });
    }

    Ok(ExportDocument {
        app: app_name.to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        scope,
        includes_media: include_media,
        data,
    })
}

/// `<app>_<scope>_<WITH_MEDIA|NO_MEDIA>_<YYYY-MM-DD>.json`
pub fn export_file_name(app_name: &str, scope: Scope, include_media: bool, date: NaiveDate) -> String {
    let suffix = if include_media { "WITH_MEDIA" } else { "NO_MEDIA" };
    format!("{app_name}_{scope}_{suffix}_{}.json", date.format("%Y-%m-%d"))
}

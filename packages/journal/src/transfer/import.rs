use common::new_id;
use common::storage::{BlobStore, MediaRecord};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::document::{ExportData, ExportDocument, FoodSection, ProgressSection, TrainSection};
use super::merge::{IdRemap, merge_by_id};
use super::{ImportMode, Scope};
use crate::error::{JournalError, Result};
use crate::media::reference::store_inline_media;
use crate::media::{MediaRef, MediaSource};
use crate::model::{Dataset, Exercise, Meal, PhotoSlot, ProgressEntry};

/// What an import changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub scope: Scope,
    #[serde(skip)]
    pub mode: ImportMode,
    /// Owning records taken from the document.
    pub records_imported: usize,
    /// Incoming owning records that received a fresh id.
    pub records_reidentified: usize,
    /// Media records written from the document's store.
    pub media_imported: usize,
    /// Incoming media records whose id collided and was replaced.
    pub media_reidentified: usize,
    /// Legacy inline entries moved into the blob store.
    pub inline_converted: usize,
    /// The local blob store was emptied before the document's was loaded.
    pub store_cleared: bool,
}

impl ImportReport {
    fn new(scope: Scope, mode: ImportMode) -> Self {
        Self {
            scope,
            mode,
            records_imported: 0,
            records_reidentified: 0,
            media_imported: 0,
            media_reidentified: 0,
            inline_converted: 0,
            store_cleared: false,
        }
    }
}

/// Parse an export document. Any structural problem is `InvalidDocument`.
pub fn parse_document(raw: &str) -> Result<ExportDocument> {
    serde_json::from_str(raw).map_err(|e| JournalError::InvalidDocument(e.to_string()))
}

/// Reject a scope the document has no data for.
pub fn validate_scope(data: &ExportData, scope: Scope) -> Result<()> {
    let present = match scope {
        Scope::Train => data.train.is_some(),
        Scope::Food => data.food.is_some(),
        Scope::Progress => data.progress.is_some(),
        Scope::All => data.train.is_some() || data.food.is_some() || data.progress.is_some(),
    };
    if present {
        Ok(())
    } else {
        Err(JournalError::ScopeMismatch(scope))
    }
}

/// Sections of `data` that `scope` selects, taken out of the document.
struct Incoming {
    train: Option<TrainSection>,
    food: Option<FoodSection>,
    progress: Option<ProgressSection>,
    media: Option<Vec<MediaRecord>>,
}

impl Incoming {
    /// Validate and decode everything up front so a bad document changes nothing.
    fn prepare(data: ExportData, scope: Scope) -> Result<Self> {
        validate_scope(&data, scope)?;
        let media = data
            .media_store()
            .map(|dump| dump.decode_all())
            .transpose()?;
        Ok(Self {
            train: data.train.filter(|_| scope.includes_train()),
            food: data.food.filter(|_| scope.includes_food()),
            progress: data.progress.filter(|_| scope.includes_progress()),
            media,
        })
    }

    fn record_count(&self) -> usize {
        self.train
            .as_ref()
            .map_or(0, |t| t.days.len() + t.exercises.len())
            + self
                .food
                .as_ref()
                .map_or(0, |f| f.mealtypes.len() + f.meals.len())
            + self.progress.as_ref().map_or(0, |p| p.records.len())
    }

    fn media_lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<MediaRef>> {
        let exercises = self
            .train
            .iter_mut()
            .flat_map(|t| t.exercises.iter_mut().map(|e| &mut e.media));
        let meals = self
            .food
            .iter_mut()
            .flat_map(|f| f.meals.iter_mut().map(|m| &mut m.media));
        exercises.chain(meals)
    }

    fn progress_mut(&mut self) -> impl Iterator<Item = &mut ProgressEntry> {
        self.progress.iter_mut().flat_map(|p| p.records.iter_mut())
    }

    async fn store_inline(&mut self, store: &dyn BlobStore) -> Result<usize> {
        let mut converted = 0;
        for media in self.media_lists_mut() {
            converted += store_inline_media(store, media).await?;
        }
        Ok(converted)
    }
}

/// Replace the in-scope collections with the document's.
///
/// When the document carries a media store, the local store is cleared and
/// refilled with the document's ids unchanged, whatever the scope.
#[instrument(skip(store, dataset, data))]
pub async fn apply_replace(
    store: &dyn BlobStore,
    dataset: &mut Dataset,
    scope: Scope,
    data: ExportData,
) -> Result<ImportReport> {
    let mut incoming = Incoming::prepare(data, scope)?;
    let mut report = ImportReport::new(scope, ImportMode::Replace);
    report.records_imported = incoming.record_count();

    if let Some(records) = incoming.media.take() {
        store.clear().await?;
        report.store_cleared = true;
        report.media_imported = records.len();
        for record in records {
            store.put(record).await?;
        }
    }

    report.inline_converted = incoming.store_inline(store).await?;

    for entry in incoming.progress_mut().filter(|p| p.id.is_empty()) {
        entry.id = new_id();
    }

    if let Some(train) = incoming.train {
        dataset.days = train.days;
        dataset.exercises = train.exercises;
    }
    if let Some(food) = incoming.food {
        dataset.meal_types = food.mealtypes;
        dataset.meals = food.meals;
    }
    if let Some(progress) = incoming.progress {
        dataset.progress = progress.records;
    }

    info!(
        records = report.records_imported,
        media = report.media_imported,
        inline = report.inline_converted,
        "Replace import finished"
    );
    Ok(report)
}

/// Merge the document into local data.
///
/// Colliding media ids and owning-record ids are replaced by fresh ones, and
/// every reference and parent id in the incoming records follows its target.
#[instrument(skip(store, dataset, data))]
pub async fn apply_add(
    store: &dyn BlobStore,
    dataset: &mut Dataset,
    scope: Scope,
    data: ExportData,
) -> Result<ImportReport> {
    let mut incoming = Incoming::prepare(data, scope)?;
    let mut report = ImportReport::new(scope, ImportMode::Add);
    report.records_imported = incoming.record_count();

    // Media store first, so references can be rewritten before records merge.
    let mut media_remap = IdRemap::new();
    if let Some(records) = incoming.media.take() {
        for mut record in records {
            if store.contains(&record.id).await? {
                let fresh = new_id();
                debug!(old = %record.id, new = %fresh, "Media id collision");
                media_remap.insert(record.id.as_str(), fresh.as_str());
                record.id = fresh;
            }
            store.put(record).await?;
            report.media_imported += 1;
        }
    }
    report.media_reidentified = media_remap.len();

    if !media_remap.is_empty() {
        for media in incoming.media_lists_mut() {
            for media_ref in media.iter_mut() {
                if let MediaSource::Stored(id) = &mut media_ref.source {
                    media_remap.rewrite(id);
                }
            }
        }
        for entry in incoming.progress_mut() {
            for slot in PhotoSlot::ALL {
                media_remap.rewrite_opt(entry.photos.slot_mut(slot));
            }
        }
    }

    report.inline_converted = incoming.store_inline(store).await?;

    let mut reidentified = 0;
    if let Some(train) = incoming.train {
        let day_remap = merge_by_id(&mut dataset.days, train.days, |_| {});
        let exercise_remap = merge_by_id(&mut dataset.exercises, train.exercises, |e: &mut Exercise| {
            day_remap.rewrite_opt(&mut e.day_id);
        });
        reidentified += day_remap.len() + exercise_remap.len();
    }
    if let Some(food) = incoming.food {
        let type_remap = merge_by_id(&mut dataset.meal_types, food.mealtypes, |_| {});
        let meal_remap = merge_by_id(&mut dataset.meals, food.meals, |m: &mut Meal| {
            type_remap.rewrite_opt(&mut m.meal_type_id);
        });
        reidentified += type_remap.len() + meal_remap.len();
    }
    if let Some(progress) = incoming.progress {
        reidentified += merge_by_id(&mut dataset.progress, progress.records, |_| {}).len();
    }
    report.records_reidentified = reidentified;

    info!(
        records = report.records_imported,
        reidentified = report.records_reidentified,
        media = report.media_imported,
        media_reidentified = report.media_reidentified,
        inline = report.inline_converted,
        "Add import finished"
    );
    Ok(report)
}

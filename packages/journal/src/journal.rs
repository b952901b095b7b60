use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use common::config::StorageConfig;
use common::new_id;
use common::now_millis;
use common::storage::filesystem::{FilesystemBlobStore, FilesystemStateStore};
use common::storage::memory::{MemoryBlobStore, MemoryStateStore};
use common::storage::{BlobStore, MediaMeta, StateStore};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::collections;
use crate::error::{JournalError, Result};
use crate::gc::{self, ReclaimReport, StoreStats};
use crate::integrity::{self, IntegrityReport};
use crate::media::reference::{self, HasMedia, MediaRef, MediaSource};
use crate::media::{DisplayHandle, Gallery, HandleCache, IngestedMedia, NormalizeOptions, Upload};
use crate::media::upload;
use crate::migration::{self, MigrationReport};
use crate::model::{Dataset, Day, Exercise, Meal, MealType, PhotoSlot, ProgressEntry};
use crate::summary::{self, DaySummary, ProgressSummary};
use crate::transfer::{self, ExportDocument, ImportMode, ImportReport, Scope};
use crate::usage;

/// The record whose media list an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOwner {
    Exercise(String),
    Meal(String),
}

impl MediaOwner {
    fn locate<'a>(&self, dataset: &'a mut Dataset) -> Result<&'a mut dyn HasMedia> {
        match self {
            MediaOwner::Exercise(id) => dataset
                .exercises
                .iter_mut()
                .find(|e| &e.id == id)
                .map(|e| e as &mut dyn HasMedia)
                .ok_or_else(|| JournalError::NotFound(format!("exercise {id}"))),
            MediaOwner::Meal(id) => dataset
                .meals
                .iter_mut()
                .find(|m| &m.id == id)
                .map(|m| m as &mut dyn HasMedia)
                .ok_or_else(|| JournalError::NotFound(format!("meal {id}"))),
        }
    }
}

/// Fields of an exercise that can be edited after creation.
#[derive(Debug, Clone, Default)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub notes_long: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MealUpdate {
    pub title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub date: Option<String>,
    pub weight: Option<Option<f64>>,
    pub notes: Option<String>,
}

/// One stored media record and how many references point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUsage {
    #[serde(flatten)]
    pub meta: MediaMeta,
    pub references: usize,
}

/// The application core: owning records, their media and the blob store.
///
/// Mutating operations are serialized; each one loads the collections it
/// needs, applies its change and writes them back before returning.
pub struct Journal {
    blobs: Arc<dyn BlobStore>,
    state: Arc<dyn StateStore>,
    handles: HandleCache,
    normalize: NormalizeOptions,
    app_name: String,
    ops: Mutex<()>,
}

impl Journal {
    pub fn new(blobs: Arc<dyn BlobStore>, state: Arc<dyn StateStore>) -> Self {
        Self {
            blobs,
            state,
            handles: HandleCache::new(),
            normalize: NormalizeOptions::default(),
            app_name: common::config::ExportConfig::default().app_name,
            ops: Mutex::new(()),
        }
    }

    /// Open the on-disk stores under `config.data_dir`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let blobs = FilesystemBlobStore::new(config.media_dir(), config.quota_bytes).await?;
        let state = FilesystemStateStore::new(config.state_dir()).await?;
        info!(data_dir = %config.data_dir.display(), "Journal opened");
        Ok(Self::new(Arc::new(blobs), Arc::new(state)))
    }

    /// A journal that lives only as long as the value.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()), Arc::new(MemoryStateStore::new()))
    }

    pub fn with_normalize(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn handles(&self) -> &HandleCache {
        &self.handles
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Bring persisted data up to the current schema. Run once at startup.
    pub async fn startup(&self) -> Result<MigrationReport> {
        let _guard = self.ops.lock().await;
        Ok(migration::run_media_migration(self.blobs(), self.state.as_ref()).await?)
    }

    pub async fn dataset(&self) -> Result<Dataset> {
        Ok(collections::load_dataset(self.state.as_ref()).await?)
    }

    async fn save(&self, dataset: &Dataset) -> Result<()> {
        Ok(collections::save_dataset(self.state.as_ref(), dataset).await?)
    }

    // Days and exercises

    pub async fn add_day(&self, title: &str) -> Result<Day> {
        let title = required("day title", title)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let day = Day {
            id: new_id(),
            title,
            created_at: now_millis(),
        };
        dataset.days.push(day.clone());
        self.save(&dataset).await?;
        Ok(day)
    }

    pub async fn rename_day(&self, day_id: &str, title: &str) -> Result<()> {
        let title = required("day title", title)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        find_mut(&mut dataset.days, day_id, "day")?.title = title;
        self.save(&dataset).await
    }

    /// Delete a day and its exercises. Their media records stay in the store.
    ///
    /// Returns how many exercises were removed with it.
    pub async fn delete_day(&self, day_id: &str) -> Result<usize> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        remove_by_id(&mut dataset.days, day_id, "day")?;
        let before = dataset.exercises.len();
        dataset
            .exercises
            .retain(|e| e.day_id.as_deref() != Some(day_id));
        let removed = before - dataset.exercises.len();
        self.save(&dataset).await?;
        info!(day_id, exercises = removed, "Day deleted");
        Ok(removed)
    }

    pub async fn add_exercise(&self, day_id: &str, name: &str, notes: &str) -> Result<Exercise> {
        let name = required("exercise name", name)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        if dataset.day(day_id).is_none() {
            return Err(JournalError::NotFound(format!("day {day_id}")));
        }
        let exercise = Exercise {
            id: new_id(),
            day_id: Some(day_id.to_string()),
            name,
            notes: notes.trim().to_string(),
            created_at: now_millis(),
            ..Default::default()
        };
        dataset.exercises.push(exercise.clone());
        self.save(&dataset).await?;
        Ok(exercise)
    }

    pub async fn update_exercise(&self, exercise_id: &str, update: ExerciseUpdate) -> Result<Exercise> {
        let name = update
            .name
            .as_deref()
            .map(|n| required("exercise name", n))
            .transpose()?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let exercise = find_mut(&mut dataset.exercises, exercise_id, "exercise")?;
        if let Some(name) = name {
            exercise.name = name;
        }
        if let Some(notes) = update.notes {
            exercise.notes = notes;
        }
        if let Some(notes_long) = update.notes_long {
            exercise.notes_long = notes_long;
        }
        if let Some(done) = update.done {
            exercise.done = done;
        }
        let updated = exercise.clone();
        self.save(&dataset).await?;
        Ok(updated)
    }

    pub async fn delete_exercise(&self, exercise_id: &str) -> Result<()> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        remove_by_id(&mut dataset.exercises, exercise_id, "exercise")?;
        self.save(&dataset).await
    }

    // Meal types and meals

    pub async fn add_meal_type(&self, title: &str) -> Result<MealType> {
        let title = required("meal type title", title)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let meal_type = MealType {
            id: new_id(),
            title,
            created_at: now_millis(),
        };
        dataset.meal_types.push(meal_type.clone());
        self.save(&dataset).await?;
        Ok(meal_type)
    }

    pub async fn rename_meal_type(&self, meal_type_id: &str, title: &str) -> Result<()> {
        let title = required("meal type title", title)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        find_mut(&mut dataset.meal_types, meal_type_id, "meal type")?.title = title;
        self.save(&dataset).await
    }

    /// Delete a meal type and its meals. Their media records stay in the store.
    pub async fn delete_meal_type(&self, meal_type_id: &str) -> Result<usize> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        remove_by_id(&mut dataset.meal_types, meal_type_id, "meal type")?;
        let before = dataset.meals.len();
        dataset
            .meals
            .retain(|m| m.meal_type_id.as_deref() != Some(meal_type_id));
        let removed = before - dataset.meals.len();
        self.save(&dataset).await?;
        info!(meal_type_id, meals = removed, "Meal type deleted");
        Ok(removed)
    }

    pub async fn add_meal(&self, meal_type_id: &str, title: &str) -> Result<Meal> {
        let title = required("meal title", title)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        if dataset.meal_type(meal_type_id).is_none() {
            return Err(JournalError::NotFound(format!("meal type {meal_type_id}")));
        }
        let meal = Meal {
            id: new_id(),
            meal_type_id: Some(meal_type_id.to_string()),
            title,
            created_at: now_millis(),
            ..Default::default()
        };
        dataset.meals.push(meal.clone());
        self.save(&dataset).await?;
        Ok(meal)
    }

    pub async fn update_meal(&self, meal_id: &str, update: MealUpdate) -> Result<Meal> {
        let title = update
            .title
            .as_deref()
            .map(|t| required("meal title", t))
            .transpose()?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let meal = find_mut(&mut dataset.meals, meal_id, "meal")?;
        if let Some(title) = title {
            meal.title = title;
        }
        if let Some(notes) = update.notes {
            meal.notes = notes;
        }
        let updated = meal.clone();
        self.save(&dataset).await?;
        Ok(updated)
    }

    pub async fn delete_meal(&self, meal_id: &str) -> Result<()> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        remove_by_id(&mut dataset.meals, meal_id, "meal")?;
        self.save(&dataset).await
    }

    // Progress

    pub async fn add_progress(
        &self,
        date: &str,
        weight: Option<f64>,
        notes: &str,
    ) -> Result<ProgressEntry> {
        let date = valid_date(date)?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let entry = ProgressEntry {
            id: new_id(),
            date,
            weight,
            notes: notes.to_string(),
            ..Default::default()
        };
        dataset.progress.push(entry.clone());
        self.save(&dataset).await?;
        Ok(entry)
    }

    pub async fn update_progress(&self, entry_id: &str, update: ProgressUpdate) -> Result<ProgressEntry> {
        let date = update.date.as_deref().map(valid_date).transpose()?;
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let entry = find_mut(&mut dataset.progress, entry_id, "progress entry")?;
        if let Some(date) = date {
            entry.date = date;
        }
        if let Some(weight) = update.weight {
            entry.weight = weight;
        }
        if let Some(notes) = update.notes {
            entry.notes = notes;
        }
        let updated = entry.clone();
        self.save(&dataset).await?;
        Ok(updated)
    }

    /// Delete a progress entry. Its photos are left for the collector.
    pub async fn delete_progress(&self, entry_id: &str) -> Result<()> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        remove_by_id(&mut dataset.progress, entry_id, "progress entry")?;
        self.save(&dataset).await
    }

    /// Store a photo in `slot`, replacing and deleting the previous one.
    pub async fn set_progress_photo(
        &self,
        entry_id: &str,
        slot: PhotoSlot,
        upload: Upload,
    ) -> Result<IngestedMedia> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        find_mut(&mut dataset.progress, entry_id, "progress entry")?;

        let ingested = upload::ingest(self.blobs(), upload, self.normalize).await?;
        let entry = find_mut(&mut dataset.progress, entry_id, "progress entry")?;
        let previous = entry.photos.slot_mut(slot).replace(ingested.media_id.clone());
        self.save(&dataset).await?;

        if let Some(previous) = previous.filter(|id| !id.is_empty()) {
            self.delete_if_unreferenced(&dataset, &previous).await?;
        }
        Ok(ingested)
    }

    /// Empty `slot` and delete its record right away.
    ///
    /// Returns the media id that was in the slot.
    pub async fn remove_progress_photo(&self, entry_id: &str, slot: PhotoSlot) -> Result<Option<String>> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let entry = find_mut(&mut dataset.progress, entry_id, "progress entry")?;
        let removed = entry.photos.slot_mut(slot).take().filter(|id| !id.is_empty());
        self.save(&dataset).await?;

        if let Some(media_id) = &removed {
            self.delete_if_unreferenced(&dataset, media_id).await?;
        }
        Ok(removed)
    }

    /// Eager delete for replaced photos. A record another owner still points
    /// at is kept.
    async fn delete_if_unreferenced(&self, dataset: &Dataset, media_id: &str) -> Result<()> {
        let remaining = usage::count_media_usage(dataset, media_id);
        if remaining > 0 {
            warn!(media_id, remaining, "Photo record still referenced, not deleted");
            return Ok(());
        }
        self.blobs.delete(media_id).await?;
        self.handles.evict(media_id);
        Ok(())
    }

    // Media references

    /// Upload files and attach the stored ones to `owner`, in order.
    ///
    /// Failures are per file; the returned list has one entry per upload.
    #[instrument(skip(self, uploads), fields(files = uploads.len()))]
    pub async fn attach_uploads(
        &self,
        owner: &MediaOwner,
        uploads: Vec<Upload>,
    ) -> Result<Vec<Result<MediaRef>>> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        owner.locate(&mut dataset)?;

        let results = upload::ingest_batch(self.blobs(), uploads, self.normalize).await;
        let record = owner.locate(&mut dataset)?;
        let attached: Vec<Result<MediaRef>> = results
            .into_iter()
            .map(|result| {
                result.map(|ingested| {
                    let local_id =
                        reference::attach(&mut *record, &ingested.media_id, &ingested.mime_type);
                    MediaRef {
                        local_id,
                        mime_type: ingested.mime_type,
                        notes: String::new(),
                        source: MediaSource::Stored(ingested.media_id),
                    }
                })
            })
            .collect();
        self.save(&dataset).await?;
        Ok(attached)
    }

    /// Attach an already stored record to `owner`.
    pub async fn attach_existing(&self, owner: &MediaOwner, media_id: &str) -> Result<String> {
        let _guard = self.ops.lock().await;
        let record = self
            .blobs
            .get(media_id)
            .await?
            .ok_or_else(|| JournalError::NotFound(format!("media {media_id}")))?;
        let mut dataset = self.dataset().await?;
        let local_id = reference::attach(owner.locate(&mut dataset)?, &record.id, &record.mime_type);
        self.save(&dataset).await?;
        Ok(local_id)
    }

    /// Remove one reference. The media record is left for the collector.
    pub async fn detach(&self, owner: &MediaOwner, local_id: &str) -> Result<MediaRef> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let removed = reference::detach(owner.locate(&mut dataset)?, local_id)
            .ok_or_else(|| JournalError::NotFound(format!("media entry {local_id}")))?;
        self.save(&dataset).await?;
        Ok(removed)
    }

    pub async fn set_media_notes(&self, owner: &MediaOwner, local_id: &str, text: &str) -> Result<()> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        if !reference::set_notes(owner.locate(&mut dataset)?, local_id, text) {
            return Err(JournalError::NotFound(format!("media entry {local_id}")));
        }
        self.save(&dataset).await
    }

    pub async fn media_of(&self, owner: &MediaOwner) -> Result<Vec<MediaRef>> {
        let mut dataset = self.dataset().await?;
        Ok(owner.locate(&mut dataset)?.media().to_vec())
    }

    pub async fn open_gallery(&self, owner: &MediaOwner, local_id: &str) -> Result<Option<Gallery>> {
        let media = self.media_of(owner).await?;
        Ok(Gallery::open(&media, local_id))
    }

    /// Edit the notes of the gallery's current item and persist them.
    pub async fn set_gallery_notes(
        &self,
        owner: &MediaOwner,
        gallery: &mut Gallery,
        text: &str,
    ) -> Result<bool> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let changed = gallery.set_notes(owner.locate(&mut dataset)?, text);
        if changed {
            self.save(&dataset).await?;
        }
        Ok(changed)
    }

    /// Display handle for a reference. Pair with [`Journal::release`].
    pub async fn resolve(&self, media_ref: &MediaRef) -> Result<Option<DisplayHandle>> {
        Ok(self.handles.resolve(self.blobs(), media_ref).await?)
    }

    pub async fn resolve_id(&self, media_id: &str) -> Result<Option<DisplayHandle>> {
        Ok(self.handles.resolve_id(self.blobs(), media_id).await?)
    }

    pub fn release(&self, media_id: &str) -> bool {
        self.handles.release(media_id)
    }

    /// Revoke every display handle, e.g. when a view is discarded.
    pub fn release_all(&self) -> usize {
        self.handles.release_all()
    }

    // Usage and reclamation

    pub async fn live_media_ids(&self) -> Result<HashSet<String>> {
        Ok(usage::collect_live_media_ids(&self.dataset().await?))
    }

    pub async fn media_usage(&self, media_id: &str) -> Result<usize> {
        Ok(usage::count_media_usage(&self.dataset().await?, media_id))
    }

    /// Every stored record with its reference count.
    pub async fn media_list(&self) -> Result<Vec<MediaUsage>> {
        let dataset = self.dataset().await?;
        Ok(self
            .blobs
            .list_meta()
            .await?
            .into_iter()
            .map(|meta| MediaUsage {
                references: usage::count_media_usage(&dataset, &meta.id),
                meta,
            })
            .collect())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(gc::store_stats(self.blobs()).await?)
    }

    pub async fn reclaim_unused(&self, dry_run: bool) -> Result<ReclaimReport> {
        let _guard = self.ops.lock().await;
        let dataset = self.dataset().await?;
        let report = gc::reclaim_unused(self.blobs(), &dataset, dry_run).await?;
        if !dry_run {
            for id in &report.unused_ids {
                self.handles.evict(id);
            }
        }
        Ok(report)
    }

    // Transfer

    pub async fn export(&self, scope: Scope, include_media: bool) -> Result<ExportDocument> {
        let dataset = self.dataset().await?;
        Ok(transfer::build_export_payload(self.blobs(), &dataset, scope, include_media, &self.app_name).await?)
    }

    pub async fn export_json(&self, scope: Scope, include_media: bool) -> Result<String> {
        let document = self.export(scope, include_media).await?;
        serde_json::to_string_pretty(&document).map_err(|e| JournalError::Internal(e.to_string()))
    }

    /// Suggested file name for an export made today.
    pub fn export_file_name(&self, scope: Scope, include_media: bool) -> String {
        transfer::export_file_name(&self.app_name, scope, include_media, Local::now().date_naive())
    }

    /// Import a document in `mode`, limited to `scope`.
    ///
    /// The document is fully validated before anything is written.
    pub async fn import(
        &self,
        document: ExportDocument,
        mode: ImportMode,
        scope: Scope,
    ) -> Result<ImportReport> {
        let _guard = self.ops.lock().await;
        let mut dataset = self.dataset().await?;
        let report = match mode {
            ImportMode::Replace => {
                transfer::apply_replace(self.blobs(), &mut dataset, scope, document.data).await?
            }
            ImportMode::Add => {
                transfer::apply_add(self.blobs(), &mut dataset, scope, document.data).await?
            }
        };
        self.save(&dataset).await?;
        if report.store_cleared {
            self.handles.release_all();
        }
        Ok(report)
    }

    pub async fn import_str(&self, raw: &str, mode: ImportMode, scope: Scope) -> Result<ImportReport> {
        let document = transfer::parse_document(raw)?;
        self.import(document, mode, scope).await
    }

    // Reports

    pub async fn check(&self) -> Result<IntegrityReport> {
        let dataset = self.dataset().await?;
        Ok(integrity::check_integrity(self.blobs(), &dataset).await?)
    }

    pub async fn day_summaries(&self) -> Result<Vec<DaySummary>> {
        Ok(summary::day_summaries(&self.dataset().await?))
    }

    pub async fn progress_summary(&self) -> Result<ProgressSummary> {
        Ok(summary::progress_summary(&self.dataset().await?))
    }
}

fn required(what: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JournalError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn valid_date(date: &str) -> Result<String> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| JournalError::Validation(format!("'{date}' is not a YYYY-MM-DD date")))?;
    Ok(date.to_string())
}

fn find_mut<'a, T: crate::model::Identified>(
    items: &'a mut [T],
    id: &str,
    what: &str,
) -> Result<&'a mut T> {
    items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| JournalError::NotFound(format!("{what} {id}")))
}

fn remove_by_id<T: crate::model::Identified>(items: &mut Vec<T>, id: &str, what: &str) -> Result<T> {
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| JournalError::NotFound(format!("{what} {id}")))?;
    Ok(items.remove(index))
}

//! Typed access to the persisted owning-record collections.

use common::new_id;
use common::storage::{StateStore, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::model::{Dataset, ProgressEntry};

/// One persisted collection and the state key it lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Days,
    Exercises,
    MealTypes,
    Meals,
    Progress,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Days,
        Collection::Exercises,
        Collection::MealTypes,
        Collection::Meals,
        Collection::Progress,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Collection::Days => "ft_days",
            Collection::Exercises => "ft_exercises",
            Collection::MealTypes => "ft_mealtypes",
            Collection::Meals => "ft_meals",
            Collection::Progress => "progress",
        }
    }
}

/// Read one collection. A collection that was never written is empty.
pub async fn load<T: DeserializeOwned>(
    state: &dyn StateStore,
    collection: Collection,
) -> Result<Vec<T>, StorageError> {
    match state.read(collection.key()).await? {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(Vec::new()),
    }
}

pub async fn save<T: Serialize>(
    state: &dyn StateStore,
    collection: Collection,
    items: &[T],
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(items)?;
    state.write(collection.key(), &raw).await
}

/// Read the progress collection, giving id-less entries a fresh id.
///
/// The collection is rewritten when any id was assigned.
pub async fn load_progress(state: &dyn StateStore) -> Result<Vec<ProgressEntry>, StorageError> {
    let mut entries: Vec<ProgressEntry> = load(state, Collection::Progress).await?;
    let mut assigned = 0;
    for entry in entries.iter_mut().filter(|e| e.id.is_empty()) {
        entry.id = new_id();
        assigned += 1;
    }
    if assigned > 0 {
        info!(assigned, "Assigned ids to progress entries");
        save(state, Collection::Progress, &entries).await?;
    }
    Ok(entries)
}

pub async fn load_dataset(state: &dyn StateStore) -> Result<Dataset, StorageError> {
    Ok(Dataset {
        days: load(state, Collection::Days).await?,
        exercises: load(state, Collection::Exercises).await?,
        meal_types: load(state, Collection::MealTypes).await?,
        meals: load(state, Collection::Meals).await?,
        progress: load_progress(state).await?,
    })
}

pub async fn save_dataset(state: &dyn StateStore, dataset: &Dataset) -> Result<(), StorageError> {
    save(state, Collection::Days, &dataset.days).await?;
    save(state, Collection::Exercises, &dataset.exercises).await?;
    save(state, Collection::MealTypes, &dataset.meal_types).await?;
    save(state, Collection::Meals, &dataset.meals).await?;
    save(state, Collection::Progress, &dataset.progress).await
}

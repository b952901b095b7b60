//! Startup migration of legacy inline media into the blob store.
//!
//! Progress is tracked in the `ft_schema` document. The step runs once per
//! schema version; later runs find the version current and do nothing.

use common::storage::{BlobStore, StateStore, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::collections::{self, Collection};
use crate::media::reference::store_inline_media;
use crate::model::{Exercise, Meal};

pub const SCHEMA_KEY: &str = "ft_schema";

/// Media layout version after every owning record holds references only.
pub const CURRENT_MEDIA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMeta {
    #[serde(default)]
    pub media_version: u32,
}

impl SchemaMeta {
    pub async fn load(state: &dyn StateStore) -> Result<Self, StorageError> {
        match state.read(SCHEMA_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Self::default()),
        }
    }

    pub async fn save(&self, state: &dyn StateStore) -> Result<(), StorageError> {
        state.write(SCHEMA_KEY, &serde_json::to_string(self)?).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// The schema was already current; nothing was read or written.
    pub skipped: bool,
    /// Inline entries moved into the blob store.
    pub converted: usize,
    /// Owning records that were rewritten.
    pub records_updated: usize,
}

/// Move every inline media entry into the blob store, once.
///
/// Records are written to the store before the collections that reference
/// them, and the schema version last, so an interrupted run leaves at worst
/// unreferenced records and is retried on the next start.
#[instrument(skip(store, state))]
pub async fn run_media_migration(
    store: &dyn BlobStore,
    state: &dyn StateStore,
) -> Result<MigrationReport, StorageError> {
    let mut schema = SchemaMeta::load(state).await?;
    if schema.media_version >= CURRENT_MEDIA_VERSION {
        return Ok(MigrationReport {
            skipped: true,
            ..Default::default()
        });
    }

    let mut report = MigrationReport::default();

    let mut exercises: Vec<Exercise> = collections::load(state, Collection::Exercises).await?;
    let before = report.converted;
    for exercise in &mut exercises {
        let converted = store_inline_media(store, &mut exercise.media).await?;
        if converted > 0 {
            report.converted += converted;
            report.records_updated += 1;
        }
    }
    if report.converted > before {
        collections::save(state, Collection::Exercises, &exercises).await?;
    }

    let mut meals: Vec<Meal> = collections::load(state, Collection::Meals).await?;
    let before = report.converted;
    for meal in &mut meals {
        let converted = store_inline_media(store, &mut meal.media).await?;
        if converted > 0 {
            report.converted += converted;
            report.records_updated += 1;
        }
    }
    if report.converted > before {
        collections::save(state, Collection::Meals, &meals).await?;
    }

    schema.media_version = CURRENT_MEDIA_VERSION;
    schema.save(state).await?;

    info!(
        converted = report.converted,
        records = report.records_updated,
        "Media migration finished"
    );
    Ok(report)
}

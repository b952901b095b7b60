use std::collections::BTreeMap;

use common::now_millis;
use common::storage::MediaRecord;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Scope;
use crate::error::{JournalError, Result};
use crate::media::data_url::{self, DataUrl};
use crate::model::{Day, Exercise, Meal, MealType, ProgressEntry};

/// Version written to `data.media.store.version`.
pub const MEDIA_STORE_VERSION: u32 = 1;

/// A portable snapshot of selected collections and, optionally, every media record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default)]
    pub app: String,
    /// RFC 3339 timestamp of the export.
    #[serde(default)]
    pub exported_at: String,
    #[serde(default = "default_scope")]
    pub scope: Scope,
    #[serde(default)]
    pub includes_media: bool,
    pub data: ExportData,
}

fn default_scope() -> Scope {
    Scope::All
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<TrainSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<FoodSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSection>,
}

impl ExportData {
    /// The document's media store, if it carries one.
    pub fn media_store(&self) -> Option<&MediaStoreDump> {
        self.media.as_ref().map(|m| &m.store)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainSection {
    pub days: Vec<Day>,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodSection {
    pub mealtypes: Vec<MealType>,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSection {
    pub records: Vec<ProgressEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSection {
    pub store: MediaStoreDump,
}

/// One media record with its bytes as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl StoreItem {
    pub fn from_record(record: &MediaRecord) -> Self {
        Self {
            id: record.id.clone(),
            mime_type: record.mime_type.clone(),
            src: data_url::encode(&record.mime_type, &record.bytes),
            created_at: Some(record.created_at),
        }
    }

    /// Decode into a record stored under `id`.
    pub fn to_record(&self, id: &str) -> Result<MediaRecord> {
        let decoded = DataUrl::parse(&self.src).map_err(|e| {
            JournalError::InvalidDocument(format!("media item '{}' has unusable bytes: {e}", self.id))
        })?;
        let mime_type = if self.mime_type.is_empty() {
            decoded.mime_type
        } else {
            self.mime_type.clone()
        };
        Ok(MediaRecord {
            id: id.to_string(),
            mime_type,
            bytes: decoded.bytes,
            created_at: self.created_at.unwrap_or_else(now_millis),
        })
    }

    /// Payload size without decoding.
    pub fn approx_bytes(&self) -> u64 {
        data_url::approx_bytes(&self.src)
    }
}

/// The serialized blob store, `{version, items: {mediaId: item}}`.
///
/// Older exports wrote the bare `{mediaId: item}` map; both shapes are read.
/// Entries that are not objects are skipped; a malformed object fails the
/// whole store.
#[derive(Debug, Clone, Serialize)]
pub struct MediaStoreDump {
    pub version: u32,
    pub items: BTreeMap<String, StoreItem>,
}

impl Default for MediaStoreDump {
    fn default() -> Self {
        Self {
            version: MEDIA_STORE_VERSION,
            items: BTreeMap::new(),
        }
    }
}

impl MediaStoreDump {
    pub fn from_records(records: &[MediaRecord]) -> Self {
        Self {
            version: MEDIA_STORE_VERSION,
            items: records
                .iter()
                .map(|r| (r.id.clone(), StoreItem::from_record(r)))
                .collect(),
        }
    }

    /// Decode every item, keyed by its map key.
    ///
    /// Fails on the first undecodable item so nothing is written from a
    /// broken document.
    pub fn decode_all(&self) -> Result<Vec<MediaRecord>> {
        self.items
            .iter()
            .map(|(key, item)| item.to_record(key))
            .collect()
    }
}

impl<'de> Deserialize<'de> for MediaStoreDump {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(mut map) = value else {
            return Err(serde::de::Error::custom("media store must be an object"));
        };

        let (version, raw_items) = match map.remove("items") {
            Some(Value::Object(items)) => {
                let version = map
                    .get("version")
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(MEDIA_STORE_VERSION);
                (version, items)
            }
            Some(other) => {
                // A record literally keyed "items" in a bare map.
                map.insert("items".to_string(), other);
                (MEDIA_STORE_VERSION, map)
            }
            None => {
                map.remove("version");
                (MEDIA_STORE_VERSION, map)
            }
        };

        let mut items = BTreeMap::new();
        for (key, raw) in raw_items {
            if !raw.is_object() {
                continue;
            }
            let mut item = serde_json::from_value::<StoreItem>(raw).map_err(|e| {
                serde::de::Error::custom(format!("malformed media store item '{key}': {e}"))
            })?;
            if item.id.is_empty() {
                item.id = key.clone();
            }
            items.insert(key, item);
        }
        Ok(Self { version, items })
    }
}

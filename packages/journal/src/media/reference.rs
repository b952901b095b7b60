//! References from owning records into the blob store.

use common::new_id;
use common::storage::{BlobStore, MediaRecord, StorageError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_url::{self, DataUrl};

/// MIME type assumed for legacy entries that never recorded one.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Where a reference's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Points at a record in the blob store.
    Stored(String),
    /// Legacy entry that still carries its bytes inline.
    Inline(Vec<u8>),
}

/// One entry of an owning record's ordered media list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// Stable within the owning record; used for UI identity.
    pub local_id: String,
    pub mime_type: String,
    pub notes: String,
    pub source: MediaSource,
}

impl MediaRef {
    pub fn stored(media_id: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            local_id: new_id(),
            mime_type: mime_type.into(),
            notes: String::new(),
            source: MediaSource::Stored(media_id.into()),
        }
    }

    /// Blob store id, if this reference is already in stored form.
    pub fn media_id(&self) -> Option<&str> {
        match &self.source {
            MediaSource::Stored(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.source, MediaSource::Inline(_))
    }
}

/// Owning records that carry a media list.
pub trait HasMedia {
    fn media(&self) -> &[MediaRef];
    fn media_mut(&mut self) -> &mut Vec<MediaRef>;
}

/// Append a reference to `media_id` and return its fresh local id.
pub fn attach(record: &mut (impl HasMedia + ?Sized), media_id: &str, mime_type: &str) -> String {
    let media_ref = MediaRef::stored(media_id, mime_type);
    let local_id = media_ref.local_id.clone();
    record.media_mut().push(media_ref);
    local_id
}

/// Remove exactly one reference by local id. The blob store is not touched.
pub fn detach(record: &mut (impl HasMedia + ?Sized), local_id: &str) -> Option<MediaRef> {
    let media = record.media_mut();
    let index = media.iter().position(|m| m.local_id == local_id)?;
    Some(media.remove(index))
}

/// Replace the notes of one reference in place.
pub fn set_notes(record: &mut (impl HasMedia + ?Sized), local_id: &str, text: &str) -> bool {
    match record
        .media_mut()
        .iter_mut()
        .find(|m| m.local_id == local_id)
    {
        Some(media_ref) => {
            media_ref.notes = text.to_string();
            true
        }
        None => false,
    }
}

/// Move every inline entry of `media` into the blob store under a fresh id.
///
/// Returns how many entries were converted.
pub async fn store_inline_media(
    store: &dyn BlobStore,
    media: &mut [MediaRef],
) -> Result<usize, StorageError> {
    let mut converted = 0;
    for media_ref in media.iter_mut() {
        let MediaSource::Inline(bytes) = &media_ref.source else {
            continue;
        };
        let record = MediaRecord::new(new_id(), media_ref.mime_type.clone(), bytes.clone());
        let media_id = record.id.clone();
        store.put(record).await?;
        media_ref.source = MediaSource::Stored(media_id);
        converted += 1;
    }
    Ok(converted)
}

/// JSON shape of a media entry: `{id, type, ref, notes}` or the legacy
/// `{id, type, src, notes}` with inline bytes.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MediaEntryWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    src: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<&MediaRef> for MediaEntryWire {
    fn from(media_ref: &MediaRef) -> Self {
        let (media_id, src) = match &media_ref.source {
            MediaSource::Stored(id) => (Some(id.clone()), None),
            MediaSource::Inline(bytes) => {
                (None, Some(data_url::encode(&media_ref.mime_type, bytes)))
            }
        };
        Self {
            id: Some(media_ref.local_id.clone()),
            mime_type: Some(media_ref.mime_type.clone()),
            media_id,
            src,
            notes: Some(media_ref.notes.clone()),
        }
    }
}

impl MediaEntryWire {
    /// Entries with neither a reference nor decodable bytes are dropped.
    fn into_media_ref(self) -> Option<MediaRef> {
        let local_id = self.id.filter(|id| !id.is_empty()).unwrap_or_else(new_id);
        let notes = self.notes.unwrap_or_default();

        if let Some(media_id) = self.media_id.filter(|id| !id.is_empty()) {
            return Some(MediaRef {
                local_id,
                mime_type: self
                    .mime_type
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                notes,
                source: MediaSource::Stored(media_id),
            });
        }

        let src = self.src.filter(|src| !src.is_empty())?;
        match DataUrl::parse(&src) {
            Ok(decoded) => Some(MediaRef {
                local_id,
                mime_type: self.mime_type.unwrap_or(decoded.mime_type),
                notes,
                source: MediaSource::Inline(decoded.bytes),
            }),
            Err(e) => {
                warn!(local_id = %local_id, error = %e, "Dropping undecodable inline media entry");
                None
            }
        }
    }
}

/// Serde adapter for `Vec<MediaRef>` fields.
pub(crate) mod entries {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{MediaEntryWire, MediaRef};

    pub fn serialize<S: Serializer>(media: &[MediaRef], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(media.len()))?;
        for media_ref in media {
            seq.serialize_element(&MediaEntryWire::from(media_ref))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<MediaRef>, D::Error> {
        let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| serde_json::from_value::<MediaEntryWire>(value).ok())
            .filter_map(MediaEntryWire::into_media_ref)
            .collect())
    }
}

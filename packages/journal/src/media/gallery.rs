//! Lightbox navigation over one owning record's media list.

use super::reference::{self, HasMedia, MediaRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub local_id: String,
    pub media_id: String,
    pub mime_type: String,
    pub notes: String,
}

impl GalleryItem {
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video")
    }
}

/// An ordered, non-empty gallery with a cursor.
///
/// Items keep the owning record's display order. Entries without a stored
/// reference are skipped.
#[derive(Debug, Clone)]
pub struct Gallery {
    items: Vec<GalleryItem>,
    index: usize,
}

impl Gallery {
    /// Open the gallery at `local_id`, or at the first item if it is not found.
    ///
    /// Returns `None` when the record has nothing to show.
    pub fn open(media: &[MediaRef], local_id: &str) -> Option<Self> {
        let items: Vec<GalleryItem> = media
            .iter()
            .filter_map(|m| {
                Some(GalleryItem {
                    local_id: m.local_id.clone(),
                    media_id: m.media_id()?.to_string(),
                    mime_type: m.mime_type.clone(),
                    notes: m.notes.clone(),
                })
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        let index = items
            .iter()
            .position(|item| item.local_id == local_id)
            .unwrap_or(0);
        Some(Self { items, index })
    }

    pub fn current(&self) -> &GalleryItem {
        &self.items[self.index]
    }

    /// 1-based position and total, as shown in the lightbox header.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn next(&mut self) -> &GalleryItem {
        self.index = (self.index + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> &GalleryItem {
        self.index = (self.index + self.items.len() - 1) % self.items.len();
        self.current()
    }

    /// Edit the current item's notes and write them back to `owner`.
    ///
    /// Returns `false` if the owning reference no longer exists.
    pub fn set_notes(&mut self, owner: &mut (impl HasMedia + ?Sized), text: &str) -> bool {
        let index = self.index;
        let item = &mut self.items[index];
        if !reference::set_notes(owner, &item.local_id, text) {
            return false;
        }
        item.notes = text.to_string();
        true
    }
}

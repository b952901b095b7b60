//! Media attachments: wire encoding, references, normalization, uploads and display.

pub mod data_url;
pub mod gallery;
pub mod handles;
pub mod normalize;
pub mod reference;
pub mod upload;

pub use gallery::{Gallery, GalleryItem};
pub use handles::{DisplayHandle, HandleCache};
pub use normalize::{NormalizeOptions, NormalizedImage, normalize};
pub use reference::{HasMedia, MediaRef, MediaSource, attach, detach, set_notes};
pub use upload::{IngestedMedia, Upload, ingest, ingest_batch};

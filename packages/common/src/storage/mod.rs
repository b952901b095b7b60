mod error;
mod key;
mod record;
mod traits;

pub mod filesystem;
pub mod memory;

pub use error::StorageError;
pub use key::StorageKey;
pub use record::{MediaMeta, MediaRecord};
pub use traits::{BlobStore, StateStore};

//! Fitness journal core: owning records, their media attachments and the
//! machinery that keeps references between them intact.

pub mod collections;
pub mod error;
pub mod gc;
pub mod integrity;
pub mod journal;
pub mod media;
pub mod migration;
pub mod model;
pub mod summary;
pub mod transfer;
pub mod usage;
pub mod view;

pub use error::{JournalError, Result};
pub use gc::{ReclaimReport, StoreStats};
pub use journal::{ExerciseUpdate, Journal, MealUpdate, MediaOwner, MediaUsage, ProgressUpdate};
pub use model::{Dataset, Day, Exercise, Meal, MealType, PhotoSlot, ProgressEntry, ProgressPhotos};
pub use transfer::{ExportDocument, ImportMode, ImportReport, Scope};
pub use view::View;

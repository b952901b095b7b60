use common::storage::StorageError;
use thiserror::Error;

use crate::transfer::Scope;

#[derive(Debug, Error)]
pub enum JournalError {
    /// Input bytes are not a usable image or video.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// The import document did not parse or lacks the expected structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document has no {0} data")]
    ScopeMismatch(Scope),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for JournalError {
    fn from(err: image::ImageError) -> Self {
        JournalError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;

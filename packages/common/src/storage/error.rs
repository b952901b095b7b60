use std::fmt;

/// Errors that can occur during blob or state storage operations.
///
/// Every variant means the storage engine could not complete the request;
/// callers surface it to the user and do not retry.
#[derive(Debug)]
pub enum StorageError {
    /// The storage engine cannot serve requests (init failure, engine offline).
    Unavailable(String),
    /// Writing the record would exceed the configured storage quota.
    QuotaExceeded { needed: u64, limit: u64 },
    /// A persisted payload could not be decoded or encoded.
    Corrupt(String),
    /// An I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage engine unavailable: {msg}"),
            Self::QuotaExceeded { needed, limit } => {
                write!(f, "storage quota exceeded ({needed} > {limit} bytes)")
            }
            Self::Corrupt(msg) => write!(f, "corrupt storage payload: {msg}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

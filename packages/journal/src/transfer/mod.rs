//! Export documents and the import/merge engine.

mod document;
mod export;
mod import;
mod merge;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use document::{
    ExportData, ExportDocument, FoodSection, MediaSection, MediaStoreDump, ProgressSection,
    StoreItem, TrainSection,
};
pub use export::{build_export_payload, export_file_name};
pub use import::{ImportReport, apply_add, apply_replace, parse_document, validate_scope};
pub use merge::{IdRemap, merge_by_id};

/// Which owning-record collections a transfer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Train,
    Food,
    Progress,
}

impl Scope {
    pub fn includes_train(self) -> bool {
        matches!(self, Scope::All | Scope::Train)
    }

    pub fn includes_food(self) -> bool {
        matches!(self, Scope::All | Scope::Food)
    }

    pub fn includes_progress(self) -> bool {
        matches!(self, Scope::All | Scope::Progress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Train => "train",
            Scope::Food => "food",
            Scope::Progress => "progress",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "train" => Ok(Scope::Train),
            "food" => Ok(Scope::Food),
            "progress" => Ok(Scope::Progress),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

/// How imported collections combine with local ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Discard local collections in scope and take the document's.
    Replace,
    /// Merge the document into local data, re-identifying collisions.
    Add,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "add" | "merge" => Ok(ImportMode::Add),
            other => Err(format!("unknown import mode '{other}'")),
        }
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and how much the app persists.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Root directory for media and state. Default: the platform data dir.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Maximum total media payload in bytes. Default: unlimited.
    #[serde(default)]
    pub quota_bytes: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("fitlog"))
        .unwrap_or_else(|| PathBuf::from("./fitlog-data"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            quota_bytes: None,
        }
    }
}

impl StorageConfig {
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }
}

/// Image normalization applied to uploaded photos.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MediaConfig {
    /// Longest edge after downscaling. Default: 1280.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// JPEG quality, 1..=100. Default: 72.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_max_dimension() -> u32 {
    1280
}
fn default_quality() -> u8 {
    72
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            quality: default_quality(),
        }
    }
}

/// Export document settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportConfig {
    /// Value of the document's `app` field. Default: "App-Fitness".
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_app_name() -> String {
    "App-Fitness".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
        }
    }
}

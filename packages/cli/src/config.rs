use std::path::Path;

use common::config::{ExportConfig, MediaConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default config file, resolved relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "config/fitlog";

/// Full application configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FitlogConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl FitlogConfig {
    /// Layer defaults, the config file and `FITLOG__SECTION__KEY` variables.
    ///
    /// The file is `path` if given, else `FITLOG_CONFIG`, else `config/fitlog`
    /// with any supported extension. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => std::env::var("FITLOG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        };
        let defaults = Self::default();

        let s = Config::builder()
            .set_default(
                "storage.data_dir",
                defaults.storage.data_dir.to_string_lossy().into_owned(),
            )?
            .set_default("media.max_dimension", i64::from(defaults.media.max_dimension))?
            .set_default("media.quality", i64::from(defaults.media.quality))?
            .set_default("export.app_name", defaults.export.app_name)?
            .add_source(File::with_name(&config_path).required(path.is_some()))
            .add_source(
                Environment::with_prefix("FITLOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

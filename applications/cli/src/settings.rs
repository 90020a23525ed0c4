//! CLI configuration
use cadence_playback::PlaybackConfig;
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

/// Prefix of environment overrides, e.g. `CADENCE_STORAGE__DATABASE_URL`
pub const ENV_PREFIX: &str = "CADENCE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = match path {
            Some(path) => config::File::from(path.to_path_buf()).required(true),
            None => config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
        };

        // Nested keys use a double underscore: CADENCE_PLAYBACK__DUCK_VOLUME
        config::Config::builder()
            .add_source(source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "database url is required (set CADENCE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.playback.duck_volume) {
            return Err(ConfigError::Message(format!(
                "playback.duck_volume must be within 0.0..=1.0, got {}",
                self.playback.duck_volume
            )));
        }

        Ok(())
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            playback: PlaybackConfig::default(),
        }
    }
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/cadence.db".to_string()
}

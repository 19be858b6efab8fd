//! Configuration for protoforge
//!
//! The core config is a TOML file that tells the model manager where
//! packages and levels live and how objects are saved:
//!
//! ```toml
//! version = 1
//! debug = false
//!
//! [resources]
//! root = "content"
//! packages_dir = "packages"
//! levels_dir = "levels"
//!
//! [save]
//! skip_default_values = true
//! ```
//!
//! A missing file is created with defaults on first load.

mod loader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use loader::{configs_dir, core_config_path, protoforge_base_dir, HOME_ENV};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Neither the home variable nor the executable location gave a base dir
    #[error("Config directory not available - could not resolve protoforge base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where content is read from and written to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Content root; relative paths resolve against the base directory
    pub root: PathBuf,

    /// Directory of `.apkg` packages, relative to `root`
    pub packages_dir: PathBuf,

    /// Directory of `.alvl` levels, relative to `root`
    pub levels_dir: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("content"),
            packages_dir: PathBuf::from("packages"),
            levels_dir: PathBuf::from("levels"),
        }
    }
}

/// How objects are written back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Leave properties out of full saves while they hold their default
    pub skip_default_values: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            skip_default_values: true,
        }
    }
}

/// Core configuration.
///
/// Loaded from `configs/core.toml` under the protoforge base directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    pub resources: ResourceConfig,

    pub save: SaveConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            resources: ResourceConfig::default(),
            save: SaveConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load core config from the default path, creating it if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&core_config_path()?)
    }

    /// Load core config from `path`, creating a default file if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded core config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Save core config to the default path.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&core_config_path()?)
    }

    /// Save core config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload core config from `path`.
    pub fn reload_from(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded core config from {:?}", path);
        Ok(())
    }

    /// Content root, resolved against `base` when relative
    pub fn content_root(&self, base: &Path) -> PathBuf {
        if self.resources.root.is_absolute() {
            self.resources.root.clone()
        } else {
            base.join(&self.resources.root)
        }
    }
}

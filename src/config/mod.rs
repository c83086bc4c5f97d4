//! Configuration module for the recipe store
//!
//! The store is configured by a small TOML file. Every field has a default,
//! so an empty or partial file is valid and a missing file simply means
//! "defaults".
//!
//! # Location
//!
//! - `$RECIPE_STORE_CONFIG` if set
//! - otherwise `<config dir>/recipe-store/config.toml`, where the config dir
//!   is platform-specific (`~/.config` on Linux,
//!   `~/Library/Application Support` on macOS, `%APPDATA%` on Windows)
//!
//! # Example
//!
//! ```toml
//! variable_tag_prefix = "dat-var-"
//! purge_orphan_maps = true
//! log_filter = "info,recipe_store=debug"
//!
//! [annotation_keys]
//! recipe = "dat-recipe"
//! ports = "dat-ports"
//! vars = "dat-vars"
//! ```

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "recipe-store";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file path
pub const CONFIG_ENV: &str = "RECIPE_STORE_CONFIG";

/// Default annotation key for recipes
pub const DEFAULT_RECIPE_KEY: &str = "dat-recipe";

/// Default annotation key for port maps
pub const DEFAULT_PORTS_KEY: &str = "dat-ports";

/// Default annotation key for var maps
pub const DEFAULT_VARS_KEY: &str = "dat-vars";

/// Default version-tag prefix for persisted variables
pub const DEFAULT_VARIABLE_TAG_PREFIX: &str = "dat-var-";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,recipe_store=debug";

/// Annotation keys under which the three per-version records are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationKeys {
    pub recipe: String,
    pub ports: String,
    pub vars: String,
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self {
            recipe: DEFAULT_RECIPE_KEY.to_string(),
            ports: DEFAULT_PORTS_KEY.to_string(),
            vars: DEFAULT_VARS_KEY.to_string(),
        }
    }
}

impl AnnotationKeys {
    /// All three keys, recipe first
    pub fn all(&self) -> [&str; 3] {
        [self.recipe.as_str(), self.ports.as_str(), self.vars.as_str()]
    }

    /// Whether `key` is one of the map keys (ports or vars)
    pub fn is_map_key(&self, key: &str) -> bool {
        key == self.ports || key == self.vars
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Version tag prefix for persisted variables
    pub variable_tag_prefix: String,

    /// Clear port/var-map annotations that have no recipe annotation on load
    pub purge_orphan_maps: bool,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Annotation keys for recipes, port maps and var maps.
    /// Kept last so it serializes as a trailing TOML table.
    pub annotation_keys: AnnotationKeys,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            variable_tag_prefix: DEFAULT_VARIABLE_TAG_PREFIX.to_string(),
            purge_orphan_maps: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            annotation_keys: AnnotationKeys::default(),
        }
    }
}

impl StoreConfig {
    /// Default config file location, honouring `$RECIPE_STORE_CONFIG`
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StoreError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize the config to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| StoreError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| {
            StoreError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}

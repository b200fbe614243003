//! TOML-based configuration for Sifter.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! include_keys = false
//! max_depth = 32
//! default_fields = "all"
//!
//! [projector]
//! flatten = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::projection::ProjectionMode;
use crate::selection::{CompileOptions, DEFAULT_MAX_DEPTH};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compiler defaults.
    pub compiler: CompilerSettings,

    /// Projector defaults.
    pub projector: ProjectorSettings,
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Honor inline filters and back-fill keys.
    pub include_keys: bool,

    /// Maximum relation nesting depth.
    pub max_depth: usize,

    /// Selection used when a query has no `fields`.
    pub default_fields: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            include_keys: false,
            max_depth: DEFAULT_MAX_DEPTH,
            default_fields: "all".to_string(),
        }
    }
}

impl CompilerSettings {
    pub fn to_options(&self) -> CompileOptions {
        CompileOptions::default()
            .with_keys(self.include_keys)
            .with_max_depth(self.max_depth)
            .with_default_fields(self.default_fields.clone())
    }
}

/// Projector configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectorSettings {
    /// Flatten nested results into dotted keys.
    pub flatten: bool,
}

impl ProjectorSettings {
    pub fn mode(&self) -> ProjectionMode {
        ProjectionMode::from_flatten(self.flatten)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SIFTER_CONFIG`
    /// 2. `./sifter.toml`
    /// 3. `~/.config/sifter/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SIFTER_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sifter.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sifter").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.compiler.default_fields.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "compiler.default_fields must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

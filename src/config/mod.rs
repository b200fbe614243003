//! Configuration module for Sifter.
//!
//! Handles compiler and projector defaults loaded from `sifter.toml`.

mod settings;

pub use settings::{CompilerSettings, ProjectorSettings, Settings, SettingsError};

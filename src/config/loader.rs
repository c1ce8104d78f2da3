// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a pipeline file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = ?path, targets = config.target.len(), "parsed pipeline file");
    Ok(config)
}

/// Load a pipeline file and validate it.
///
/// Checks for:
/// - unknown or self `after` references,
/// - malformed `dynamic` declarations and literal values,
/// - dependency cycles,
/// - global `[config]` sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// `Branchdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Branchdag.toml")
}

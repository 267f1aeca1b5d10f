// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{EngineConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// Environment overrides are *not* applied here; see
/// [`EngineConfig::apply_env`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

/// `Drivertrack.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Drivertrack.toml")
}

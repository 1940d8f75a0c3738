// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Profile, RawProfile};
use crate::errors::Result;

/// Load a profile from a given path and return the raw `RawProfile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// duration parsing and sanity checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProfile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let profile: RawProfile = toml::from_str(&contents)?;

    Ok(profile)
}

/// Load a profile from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Profile> {
    let raw = load_from_path(&path)?;
    let profile = Profile::try_from(raw)?;
    Ok(profile)
}

/// Profile picked up from the working directory when `--config` is absent.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Procstream.toml")
}

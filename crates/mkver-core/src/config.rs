use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::render::OutputFormat;

pub const CONFIG_FILENAME: &str = ".mkver.toml";
pub const DEFAULT_OUTPUT: &str = "Version.ts";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MkverConfig {
    /// Output path used when none is given on the command line.
    pub output: Option<String>,
    /// Manifest to read instead of detecting package.json / Cargo.toml.
    pub manifest: Option<String>,
    /// Output dialect (cjs, esm, ts, json, rust); defaults to the extension.
    pub format: Option<String>,
}

impl MkverConfig {
    /// Output path: explicit argument, then config, then [`DEFAULT_OUTPUT`].
    pub fn output_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        self.output
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn manifest_path(&self, dir: &Path) -> Option<PathBuf> {
        self.manifest
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| dir.join(value))
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>, ConfigError> {
        match self.format.as_deref() {
            None => Ok(None),
            Some(value) => value
                .parse::<OutputFormat>()
                .map(Some)
                .map_err(ConfigError::Invalid),
        }
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

/// Loads `.mkver.toml` from `dir`. A missing file is `Ok(None)`; a broken one
/// is an error.
pub fn load_config(dir: &Path) -> Result<Option<MkverConfig>, ConfigError> {
    let path = config_path(dir);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    let config = toml::from_str::<MkverConfig>(&text)?;
    config.output_format()?;
    Ok(Some(config))
}

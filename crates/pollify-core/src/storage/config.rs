//! TOML-based application configuration.
//!
//! Stored at `~/.config/pollify/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Override for the SQLite database path. Defaults to
    /// `<data_dir>/pollify.db` when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Default identity key used when the caller supplies none
    /// (e.g. CLI fills without --identity).
    #[serde(default)]
    pub default_identity: Option<String>,
}

impl Config {
    fn path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist or fails to parse.
    pub fn load() -> Self {
        let Ok(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("failed to parse {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save the configuration.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, raw)
    }

    /// Effective database path.
    pub fn database_path(&self) -> Result<PathBuf, std::io::Error> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("pollify.db")),
        }
    }
}

//! Viewer configuration read from a TOML file.

use crate::error::{Result, ViewerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "BLASTVIEWER_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "blastviewer.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GO ontology definitions in OBO format.
    pub go_obo_path: Option<PathBuf>,
    /// Starting directory of the export dialog.
    pub export_dir: Option<PathBuf>,
}

impl Config {
    /// Where the config is read from.
    pub fn location() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read a config file. A missing file gives the default config.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ViewerError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ViewerError::Config(e.to_string()))
    }

    /// Read the config from its usual location, falling back to defaults
    /// when it cannot be parsed.
    pub fn load() -> (Self, Option<String>) {
        let path = Self::location();
        match Self::from_path(&path) {
            Ok(config) => (config, None),
            Err(e) => {
                warn!("Ignoring config {}: {}", path.display(), e);
                (Self::default(), Some(e.to_string()))
            }
        }
    }
}

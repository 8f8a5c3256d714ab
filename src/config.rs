//! Runtime configuration
//!
//! Read from a TOML file. Every field has a default so a partial (or missing)
//! file is fine.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::campaign::DEFAULT_STORAGE_KEY;
use crate::dialogue::DEFAULT_MAX_HOPS;
use crate::error::NarrativeError;
use crate::event_bus::DEFAULT_MAX_CASCADE;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Key the campaign state is saved under
    pub storage_key: String,
    /// Root of `quests/`, `dialogues/` and `triggers/`
    pub data_dir: PathBuf,
    /// Directory used by the file storage backend
    pub save_dir: PathBuf,
    /// Queued events dispatched per top-level emit before the bus gives up
    pub max_cascade: usize,
    /// Node transitions allowed without player input
    pub max_dialogue_hops: u32,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: PathBuf::from("data"),
            save_dir: PathBuf::from("saves"),
            max_cascade: DEFAULT_MAX_CASCADE,
            max_dialogue_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl NarrativeConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, NarrativeError> {
        if !path.exists() {
            warn!("Config {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| NarrativeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml(&content).map_err(|message| NarrativeError::Config {
            path: path.to_path_buf(),
            message,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }
}

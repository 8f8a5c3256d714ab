//! Error types
//!
//! Gameplay operations never fail loudly; these only surface from loading
//! content, reading configuration, and the storage port.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`crate::storage::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures while reading authored quest, dialogue or trigger files.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid objective type '{kind}' at index {index} in quest '{quest_id}'")]
    InvalidObjective {
        quest_id: String,
        kind: String,
        index: usize,
    },

    #[error("objective '{objective_id}' in quest '{quest_id}' needs a target")]
    MissingTarget {
        quest_id: String,
        objective_id: String,
    },

    #[error("quest '{0}' has no objectives")]
    EmptyQuest(String),
}

/// Top-level error for the setup surfaces (config, content, saves).
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("invalid config {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RoomId;

/// A single configuration or save record that could not be turned into a live
/// entity. Never fatal: the record is skipped and the rest keeps loading.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LoadError {
    #[error("room {room_id}: unknown enemy type '{tag}'")]
    UnknownEnemyType { room_id: RoomId, tag: String },

    #[error("room {room_id}: enemy '{tag}' has no spawn position")]
    MissingPosition { room_id: RoomId, tag: String },

    #[error("room {room_id}: unknown item type '{tag}'")]
    UnknownItemType { room_id: RoomId, tag: String },

    #[error("room {room_id}: invalid record: {reason}")]
    InvalidRecord { room_id: RoomId, reason: String },

    #[error("room {room_id} is referenced but not defined")]
    MissingRoom { room_id: RoomId },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Skipped records collected during a load, for the caller to log or inspect.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.skipped.extend(other.skipped);
    }

    pub fn log(&self, subsystem: &str) {
        for error in &self.skipped {
            tracing::warn!("[{subsystem}] skipped record: {error}");
        }
    }
}

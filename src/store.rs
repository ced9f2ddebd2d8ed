//! Small key-less record stores used for item state and room configuration.
//! Read failures look like an absent record; write failures are logged and
//! reported through the return value, never raised.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

pub trait RecordStore {
    fn read(&self) -> Option<Value>;
    fn write(&mut self, value: &Value) -> bool;
    fn remove(&mut self);
}

/// One pretty-printed JSON document on disk.
pub struct JsonFileStore {
    file_path: PathBuf,
    label: &'static str,
}

impl JsonFileStore {
    pub fn new(file_path: PathBuf, label: &'static str) -> Self {
        Self { file_path, label }
    }
}

impl RecordStore for JsonFileStore {
    fn read(&self) -> Option<Value> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(value) => value,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "[{}] failed to read {}: {error}",
                        self.label,
                        self.file_path.display()
                    );
                }
                return None;
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(
                    "[{}] failed to parse {}: {error}",
                    self.label,
                    self.file_path.display()
                );
                None
            }
        }
    }

    fn write(&mut self, value: &Value) -> bool {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::warn!(
                    "[{}] failed to create parent dir {}: {error}",
                    self.label,
                    parent.display()
                );
                return false;
            }
        }

        match serde_json::to_string_pretty(value) {
            Ok(text) => match fs::write(&self.file_path, text) {
                Ok(()) => true,
                Err(error) => {
                    tracing::warn!(
                        "[{}] failed to write {}: {error}",
                        self.label,
                        self.file_path.display()
                    );
                    false
                }
            },
            Err(error) => {
                tracing::warn!(
                    "[{}] failed to serialize payload for {}: {error}",
                    self.label,
                    self.file_path.display()
                );
                false
            }
        }
    }

    fn remove(&mut self) {
        if let Err(error) = fs::remove_file(&self.file_path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "[{}] failed to remove {}: {error}",
                    self.label,
                    self.file_path.display()
                );
            }
        }
    }
}

/// In-process store for tests and headless runs without a state directory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    value: Option<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn read(&self) -> Option<Value> {
        self.value.clone()
    }

    fn write(&mut self, value: &Value) -> bool {
        self.value = Some(value.clone());
        true
    }

    fn remove(&mut self) {
        self.value = None;
    }
}

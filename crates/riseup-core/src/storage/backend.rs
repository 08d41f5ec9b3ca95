//! Load/save backends used by repositories and the alarm store.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Persistent home for a single value.
pub trait StorageBackend<T>: Send + Sync {
    /// Load the stored value. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<T>, StorageError>;

    fn save(&self, value: &T) -> Result<(), StorageError>;
}

/// A TOML file on disk.
pub struct TomlFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TomlFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> StorageBackend<T> for TomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    fn save(&self, value: &T) -> Result<(), StorageError> {
        let content = toml::to_string_pretty(value)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Keeps the value in memory. Used by tests and embedders that persist
/// elsewhere.
pub struct MemoryBackend<T> {
    slot: Mutex<Option<T>>,
}

impl<T> MemoryBackend<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
        }
    }
}

impl<T> Default for MemoryBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StorageBackend<T> for MemoryBackend<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<Option<T>, StorageError> {
        let slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slot.clone())
    }

    fn save(&self, value: &T) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        *slot = Some(value.clone());
        Ok(())
    }
}

//! A single persisted value with an injected backend.

use std::fmt;

use tracing::warn;

use super::backend::StorageBackend;
use crate::error::StorageError;

/// Owns the current value of `T` and writes it through the backend on
/// every change. Build one per process and share it.
pub struct Repository<T> {
    backend: Box<dyn StorageBackend<T>>,
    value: T,
}

impl<T: Clone + Default> Repository<T> {
    /// Load the stored value, falling back to `T::default()` when nothing
    /// is stored or the stored value is unreadable.
    pub fn open(backend: impl StorageBackend<T> + 'static) -> Self {
        let value = match backend.load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(error = %e, "failed to load stored value, using defaults");
                T::default()
            }
        };
        Self {
            backend: Box::new(backend),
            value,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Apply `change` and persist the result. The in-memory value only
    /// changes if the save succeeds.
    pub fn update<R>(&mut self, change: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let mut next = self.value.clone();
        let out = change(&mut next);
        self.backend.save(&next)?;
        self.value = next;
        Ok(out)
    }

    /// Like [`Repository::update`] for changes that can fail.
    pub fn try_update<R, E>(&mut self, change: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let mut next = self.value.clone();
        let out = change(&mut next)?;
        self.backend.save(&next)?;
        self.value = next;
        Ok(out)
    }

    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.update(|value| *value = T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

//! Core error types for riseup-core.
//!
//! This module defines the error hierarchy using thiserror. Scheduling
//! itself never surfaces errors to callers (a failed read is treated as an
//! empty alarm set), so these types mostly describe storage and input
//! validation failures.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for riseup-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The scheduler runtime task is no longer running
    #[error("Scheduler runtime has stopped")]
    RuntimeStopped,
}

/// Persistence and alarm store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read or write a backing file
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Value could not be serialized for writing
    #[error("Failed to serialize data: {0}")]
    Serialize(String),

    /// Alarm collection has not been loaded yet
    #[error("Alarm store has not been loaded")]
    NotLoaded,

    /// A lock guarding in-memory state was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,

    /// No alarm with the given id
    #[error("Alarm '{0}' not found")]
    AlarmNotFound(String),

    /// Data directory could not be determined or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration key does not exist
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Key is empty
    #[error("config key is empty")]
    EmptyKey,

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Time-of-day string could not be parsed
    #[error("Invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// Date string could not be parsed
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Day name or index is not a weekday
    #[error("Invalid day '{0}'")]
    InvalidDay(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::ser::Error> for StorageError {
    fn from(err: toml::ser::Error) -> Self {
        StorageError::Serialize(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layered_errors_convert_into_core_error() {
        let err: CoreError = StorageError::AlarmNotFound("a1".into()).into();
        assert!(matches!(err, CoreError::Storage(StorageError::AlarmNotFound(_))));
        assert_eq!(err.to_string(), "Storage error: Alarm 'a1' not found");

        let err: CoreError = ConfigError::UnknownKey("volume".into()).into();
        assert_eq!(err.to_string(), "Configuration error: unknown config key: volume");

        let err: CoreError = ValidationError::InvalidTime("7.30".into()).into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}

mod alarms;
mod backend;
mod config;
mod repository;
mod stats;

pub use alarms::{AlarmBook, AlarmStore};
pub use backend::{MemoryBackend, StorageBackend, TomlFile};
pub use config::{Settings, Theme};
pub use repository::Repository;
pub use stats::{AlarmStats, DailyRecord, StatsLedger, StatsTracker, WeeklyPerformance};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/riseup[-dev]/` based on RISEUP_ENV.
///
/// Set RISEUP_ENV=dev to use development data directory.
/// Set RISEUP_DATA_DIR to use an explicit directory instead.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("RISEUP_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("RISEUP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("riseup-dev")
            } else {
                base_dir.join("riseup")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Alarm store backed by `<data_dir>/alarms.toml`. Not loaded yet.
pub fn open_alarm_store() -> Result<AlarmStore, StorageError> {
    Ok(AlarmStore::new(TomlFile::new(data_dir()?.join("alarms.toml"))))
}

/// Settings backed by `<data_dir>/config.toml`.
pub fn open_settings() -> Result<Repository<Settings>, StorageError> {
    Ok(Repository::open(TomlFile::new(data_dir()?.join("config.toml"))))
}

/// Wake-up statistics backed by `<data_dir>/stats.toml`.
pub fn open_stats() -> Result<StatsTracker, StorageError> {
    Ok(StatsTracker::new(Repository::open(TomlFile::new(
        data_dir()?.join("stats.toml"),
    ))))
}

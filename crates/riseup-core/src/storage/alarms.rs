//! The alarm store.
//!
//! Owns the persisted alarm definitions and publishes a revision number
//! on every change so the scheduler can recompute without waiting for its
//! next tick.

use std::sync::RwLock;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backend::StorageBackend;
use crate::alarm::AlarmDefinition;
use crate::error::StorageError;
use crate::scheduler::AlarmSource;

/// On-disk shape of the alarm collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmBook {
    #[serde(default)]
    pub alarms: Vec<AlarmDefinition>,
}

pub struct AlarmStore {
    backend: Box<dyn StorageBackend<AlarmBook>>,
    /// `None` until [`AlarmStore::load`] has run.
    alarms: RwLock<Option<Vec<AlarmDefinition>>>,
    revision: watch::Sender<u64>,
}

impl AlarmStore {
    /// Create an unloaded store. Reads fail with `NotLoaded` until
    /// [`AlarmStore::load`] is called.
    pub fn new(backend: impl StorageBackend<AlarmBook> + 'static) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            backend: Box::new(backend),
            alarms: RwLock::new(None),
            revision,
        }
    }

    /// Load alarms from the backend.
    ///
    /// When nothing is stored the store starts with a single default alarm,
    /// which is saved. Unreadable data also yields the default alarm but is
    /// left on disk untouched until the next mutation. Returns the number of
    /// alarms.
    pub fn load(&self, now: NaiveDateTime) -> Result<usize, StorageError> {
        let alarms = match self.backend.load() {
            Ok(Some(book)) => book.alarms,
            Ok(None) => {
                info!("no saved alarms, creating default alarm");
                let alarms = vec![AlarmDefinition::new_default(now)];
                if let Err(e) = self.backend.save(&AlarmBook {
                    alarms: alarms.clone(),
                }) {
                    warn!(error = %e, "failed to save default alarm");
                }
                alarms
            }
            Err(e) => {
                warn!(error = %e, "failed to load alarms, creating default alarm");
                vec![AlarmDefinition::new_default(now)]
            }
        };
        let count = alarms.len();
        let mut guard = self.alarms.write().map_err(|_| StorageError::Poisoned)?;
        *guard = Some(alarms);
        drop(guard);
        self.bump();
        Ok(count)
    }

    /// Re-read the backend after another process may have written to it.
    ///
    /// The snapshot is replaced (and subscribers notified) only when the
    /// stored alarms differ from it. A missing file changes nothing; an
    /// unreadable one is an error and keeps the current snapshot. Returns
    /// whether anything changed.
    pub fn reload(&self) -> Result<bool, StorageError> {
        let Some(book) = self.backend.load()? else {
            return Ok(false);
        };
        let mut guard = self.alarms.write().map_err(|_| StorageError::Poisoned)?;
        if (*guard).as_ref() == Some(&book.alarms) {
            return Ok(false);
        }
        let count = book.alarms.len();
        *guard = Some(book.alarms);
        drop(guard);
        self.bump();
        debug!(count, "alarms reloaded");
        Ok(true)
    }

    pub fn is_loaded(&self) -> bool {
        self.alarms.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Snapshot of every alarm in insertion order.
    pub fn alarms(&self) -> Result<Vec<AlarmDefinition>, StorageError> {
        let guard = self.alarms.read().map_err(|_| StorageError::Poisoned)?;
        guard.clone().ok_or(StorageError::NotLoaded)
    }

    pub fn get(&self, id: &str) -> Result<AlarmDefinition, StorageError> {
        self.alarms()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::AlarmNotFound(id.to_string()))
    }

    pub fn add(&self, alarm: AlarmDefinition) -> Result<AlarmDefinition, StorageError> {
        let added = alarm.clone();
        self.mutate(move |alarms| {
            alarms.push(alarm);
            Ok(())
        })?;
        debug!(alarm_id = %added.id, "alarm added");
        Ok(added)
    }

    /// Add the default 07:00 weekday alarm.
    pub fn add_default(&self, now: NaiveDateTime) -> Result<AlarmDefinition, StorageError> {
        self.add(AlarmDefinition::new_default(now))
    }

    /// Replace the alarm with the same id.
    pub fn update(&self, alarm: AlarmDefinition) -> Result<(), StorageError> {
        let id = alarm.id.clone();
        self.mutate(move |alarms| {
            let slot = alarms
                .iter_mut()
                .find(|a| a.id == alarm.id)
                .ok_or_else(|| StorageError::AlarmNotFound(alarm.id.clone()))?;
            *slot = alarm;
            Ok(())
        })?;
        debug!(alarm_id = %id, "alarm updated");
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<AlarmDefinition, StorageError> {
        let removed = self.mutate(|alarms| {
            let index = alarms
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| StorageError::AlarmNotFound(id.to_string()))?;
            Ok(alarms.remove(index))
        })?;
        debug!(alarm_id = %id, "alarm deleted");
        Ok(removed)
    }

    /// Flip the enabled flag. Returns the new value.
    pub fn toggle(&self, id: &str) -> Result<bool, StorageError> {
        let enabled = self.mutate(|alarms| {
            let alarm = alarms
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| StorageError::AlarmNotFound(id.to_string()))?;
            alarm.enabled = !alarm.enabled;
            Ok(alarm.enabled)
        })?;
        debug!(alarm_id = %id, enabled, "alarm toggled");
        Ok(enabled)
    }

    /// Change notification. The value is a revision counter bumped on
    /// every load and mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Vec<AlarmDefinition>) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let mut guard = self.alarms.write().map_err(|_| StorageError::Poisoned)?;
        let current = guard.as_ref().ok_or(StorageError::NotLoaded)?;
        let mut next = current.clone();
        let out = change(&mut next)?;
        self.backend.save(&AlarmBook {
            alarms: next.clone(),
        })?;
        *guard = Some(next);
        drop(guard);
        self.bump();
        Ok(out)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl AlarmSource for AlarmStore {
    fn snapshot(&self) -> Result<Vec<AlarmDefinition>, StorageError> {
        self.alarms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::DaySet;
    use crate::storage::{MemoryBackend, TomlFile};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap()
    }

    fn loaded_store() -> AlarmStore {
        let store = AlarmStore::new(MemoryBackend::with_value(AlarmBook::default()));
        store.load(now()).unwrap();
        store
    }

    struct BrokenBackend;

    impl StorageBackend<AlarmBook> for BrokenBackend {
        fn load(&self) -> Result<Option<AlarmBook>, StorageError> {
            Err(StorageError::Parse {
                path: "alarms.toml".into(),
                message: "garbage".into(),
            })
        }

        fn save(&self, _book: &AlarmBook) -> Result<(), StorageError> {
            Err(StorageError::Serialize("disk full".into()))
        }
    }

    #[test]
    fn unloaded_store_is_unreadable() {
        let store = AlarmStore::new(MemoryBackend::new());
        assert!(matches!(store.alarms(), Err(StorageError::NotLoaded)));
        assert!(!store.is_loaded());
    }

    #[test]
    fn empty_backend_gets_default_alarm() {
        let store = AlarmStore::new(MemoryBackend::new());
        assert_eq!(store.load(now()).unwrap(), 1);
        let alarms = store.alarms().unwrap();
        assert_eq!(alarms[0].label, "Wake Up!");
        assert_eq!(alarms[0].days, DaySet::weekdays());
    }

    #[test]
    fn default_alarm_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.toml");
        let store = AlarmStore::new(TomlFile::new(&path));
        store.load(now()).unwrap();
        let id = store.alarms().unwrap()[0].id.clone();

        let reopened = AlarmStore::new(TomlFile::new(&path));
        reopened.load(now()).unwrap();
        assert_eq!(reopened.get(&id).unwrap().label, "Wake Up!");
    }

    #[test]
    fn unreadable_backend_gets_default_alarm() {
        let store = AlarmStore::new(BrokenBackend);
        assert_eq!(store.load(now()).unwrap(), 1);
    }

    #[test]
    fn saved_empty_list_stays_empty() {
        let store = loaded_store();
        assert!(store.alarms().unwrap().is_empty());
    }

    #[test]
    fn crud_operations() {
        let store = loaded_store();
        let alarm = store.add(AlarmDefinition::new(now(), DaySet::empty())).unwrap();
        assert_eq!(store.alarms().unwrap().len(), 1);

        let mut edited = alarm.clone();
        edited.label = "Gym".into();
        store.update(edited).unwrap();
        assert_eq!(store.get(&alarm.id).unwrap().label, "Gym");

        assert!(!store.toggle(&alarm.id).unwrap());
        assert!(!store.get(&alarm.id).unwrap().enabled);
        assert!(store.toggle(&alarm.id).unwrap());

        let removed = store.delete(&alarm.id).unwrap();
        assert_eq!(removed.id, alarm.id);
        assert!(matches!(
            store.delete(&alarm.id),
            Err(StorageError::AlarmNotFound(_))
        ));
    }

    #[test]
    fn update_unknown_alarm_fails() {
        let store = loaded_store();
        let stranger = AlarmDefinition::new(now(), DaySet::empty());
        assert!(matches!(
            store.update(stranger),
            Err(StorageError::AlarmNotFound(_))
        ));
    }

    #[test]
    fn failed_save_leaves_snapshot_unchanged() {
        let store = AlarmStore::new(BrokenBackend);
        store.load(now()).unwrap();
        let before = store.alarms().unwrap();
        let revision = store.revision();
        assert!(store.add(AlarmDefinition::new(now(), DaySet::empty())).is_err());
        assert_eq!(store.alarms().unwrap(), before);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn mutations_notify_subscribers() {
        let store = loaded_store();
        let mut rx = store.subscribe();
        rx.borrow_and_update();
        store.add_default(now()).unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn reload_picks_up_changes_from_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.toml");
        let store = AlarmStore::new(TomlFile::new(&path));
        store.load(now()).unwrap();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert!(!store.reload().unwrap());
        assert!(!rx.has_changed().unwrap());

        let other = AlarmStore::new(TomlFile::new(&path));
        other.load(now()).unwrap();
        let added = other.add(AlarmDefinition::new(now(), DaySet::weekends())).unwrap();

        assert!(store.reload().unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.get(&added.id).unwrap(), added);
    }

    #[test]
    fn reload_keeps_snapshot_when_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.toml");
        let store = AlarmStore::new(TomlFile::new(&path));
        store.load(now()).unwrap();
        let before = store.alarms().unwrap();

        std::fs::write(&path, "alarms = 42 [[[").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.alarms().unwrap(), before);

        std::fs::remove_file(&path).unwrap();
        assert!(!store.reload().unwrap());
        assert_eq!(store.alarms().unwrap(), before);
    }

    #[test]
    fn persists_to_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.toml");

        let store = AlarmStore::new(TomlFile::new(&path));
        store.load(now()).unwrap();
        let alarm = store.add(AlarmDefinition::new(now(), DaySet::weekends())).unwrap();

        let reopened = AlarmStore::new(TomlFile::new(&path));
        reopened.load(now()).unwrap();
        let alarms = reopened.alarms().unwrap();
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].label, "Wake Up!");
        assert_eq!(alarms[1], alarm);
    }
}

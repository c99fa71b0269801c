// Reading manager - Owns one user's readings and keeps the store in sync
use crate::application::reading_repository::{ReadingRepository, StoreError};
use crate::domain::reading::WaterReading;
use crate::domain::summary::filter_by_profile;
use crate::domain::validation::{validate_edit, ReadingEdit, ValidationErrors};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// How a stored row is located for edits and deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingKey {
    Id(Uuid),
    /// Exact timestamp string. Several rows may share one.
    Timestamp(String),
}

impl ReadingKey {
    fn matches(&self, reading: &WaterReading) -> bool {
        match self {
            ReadingKey::Id(id) => reading.id == *id,
            ReadingKey::Timestamp(timestamp) => reading.timestamp == *timestamp,
        }
    }
}

impl fmt::Display for ReadingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingKey::Id(id) => write!(f, "id {}", id),
            ReadingKey::Timestamp(timestamp) => write!(f, "timestamp '{}'", timestamp),
        }
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("No reading found for {0}")]
    NotFound(ReadingKey),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ReadingManager {
    username: String,
    repository: Arc<dyn ReadingRepository>,
    readings: Vec<WaterReading>,
}

impl fmt::Debug for ReadingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadingManager")
            .field("username", &self.username)
            .field("readings", &self.readings.len())
            .finish()
    }
}

impl ReadingManager {
    /// Binds a manager to one user and loads whatever is stored.
    pub fn open(
        username: impl Into<String>,
        repository: Arc<dyn ReadingRepository>,
    ) -> Result<Self, StoreError> {
        let mut manager = Self {
            username: username.into(),
            repository,
            readings: Vec::new(),
        };
        manager.load()?;
        Ok(manager)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Replaces the in-memory list with the stored one. Nothing stored
    /// means no readings. Rows stored without an id get one, and the file is
    /// rewritten once so the ids survive the next load.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let mut readings = self.repository.load()?.unwrap_or_default();
        let assigned = readings
            .iter_mut()
            .map(WaterReading::assign_missing_id)
            .filter(|changed| *changed)
            .count();
        if assigned > 0 {
            self.repository.save(&readings)?;
            tracing::info!(
                "Assigned ids to {} stored reading(s) for user {}",
                assigned,
                self.username
            );
        }
        self.readings = readings;
        tracing::debug!(
            "Loaded {} readings for user {}",
            self.readings.len(),
            self.username
        );
        Ok(())
    }

    /// Explicit reload, for when the file may have been edited elsewhere.
    pub fn refresh(&mut self) -> Result<usize, StoreError> {
        self.load()?;
        Ok(self.readings.len())
    }

    /// Appends and persists. The in-memory list stays authoritative after a
    /// successful write; a failed write drops the new reading again.
    pub fn add(&mut self, reading: WaterReading) -> Result<&WaterReading, StoreError> {
        self.readings.push(reading);
        if let Err(e) = self.persist() {
            self.readings.pop();
            return Err(e);
        }

        let added = &self.readings[self.readings.len() - 1];
        tracing::info!(
            "Added reading {} for profile '{}' (user {})",
            added.id,
            added.name,
            self.username
        );
        Ok(added)
    }

    pub fn get_all(&self) -> &[WaterReading] {
        &self.readings
    }

    pub fn find(&self, key: &ReadingKey) -> Option<&WaterReading> {
        self.readings.iter().find(|r| key.matches(r))
    }

    /// Distinct profile names in first-seen order and spelling. Names that
    /// differ only in case are one profile.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for reading in &self.readings {
            if !names.iter().any(|name| reading.is_profile(name)) {
                names.push(reading.name.clone());
            }
        }
        names
    }

    pub fn readings_for(&self, profile: &str) -> Vec<&WaterReading> {
        filter_by_profile(&self.readings, profile)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        let previous = std::mem::take(&mut self.readings);
        if let Err(e) = self.persist() {
            self.readings = previous;
            return Err(e);
        }
        tracing::info!("Cleared {} readings for user {}", previous.len(), self.username);
        Ok(())
    }

    /// Rewrites the first row matching `key` with the edited values after
    /// re-checking them. Timestamp and id are kept.
    pub fn update(
        &mut self,
        key: &ReadingKey,
        edit: ReadingEdit,
    ) -> Result<&WaterReading, ManagerError> {
        validate_edit(&edit)?;

        let index = self
            .readings
            .iter()
            .position(|r| key.matches(r))
            .ok_or_else(|| ManagerError::NotFound(key.clone()))?;

        let previous = self.readings[index].clone();
        {
            let target = &mut self.readings[index];
            target.name = edit.name.trim().to_string();
            target.ph = edit.ph;
            target.temperature = edit.temperature;
            target.ammonia = edit.ammonia;
        }

        if let Err(e) = self.persist() {
            self.readings[index] = previous;
            return Err(e.into());
        }

        tracing::info!("Updated reading {} for user {}", key, self.username);
        Ok(&self.readings[index])
    }

    /// Removes every row matching `key` and returns how many went.
    pub fn delete(&mut self, key: &ReadingKey) -> Result<usize, ManagerError> {
        let before = self.readings.len();
        let (removed, kept): (Vec<WaterReading>, Vec<WaterReading>) = self
            .readings
            .drain(..)
            .partition(|r| key.matches(r));
        self.readings = kept;

        if removed.is_empty() {
            return Err(ManagerError::NotFound(key.clone()));
        }

        if let Err(e) = self.persist() {
            self.readings = self.restore_order(removed, key, before);
            return Err(e.into());
        }

        tracing::info!(
            "Deleted {} reading(s) by {} for user {}",
            removed.len(),
            key,
            self.username
        );
        Ok(removed.len())
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.repository.save(&self.readings)
    }

    fn restore_order(
        &mut self,
        removed: Vec<WaterReading>,
        key: &ReadingKey,
        before: usize,
    ) -> Vec<WaterReading> {
        // The file was not rewritten, so the stored order is still the truth.
        match self.repository.load() {
            Ok(Some(stored)) if stored.len() == before => stored,
            _ => {
                tracing::warn!(
                    "Could not reload after failed delete by {}; restored rows moved to the end",
                    key
                );
                let mut readings = std::mem::take(&mut self.readings);
                readings.extend(removed);
                readings
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::json_reading_repository::JsonReadingRepository;
    use std::sync::Mutex;

    fn open_in(dir: &tempfile::TempDir) -> (ReadingManager, Arc<JsonReadingRepository>) {
        let repository = Arc::new(JsonReadingRepository::open(dir.path(), "alice").unwrap());
        let manager = ReadingManager::open("alice", repository.clone()).unwrap();
        (manager, repository)
    }

    fn reading(name: &str, timestamp: &str) -> WaterReading {
        WaterReading::with_timestamp(name.to_string(), 7.0, 25.0, 0.1, timestamp.to_string())
    }

    fn read_file(repository: &JsonReadingRepository) -> Vec<WaterReading> {
        let raw = std::fs::read_to_string(repository.path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Keeps readings in memory and fails every save once told to.
    #[derive(Default)]
    struct FlakyRepository {
        stored: Mutex<Option<Vec<WaterReading>>>,
        fail: Mutex<bool>,
    }

    impl ReadingRepository for FlakyRepository {
        fn load(&self) -> Result<Option<Vec<WaterReading>>, StoreError> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn save(&self, readings: &[WaterReading]) -> Result<(), StoreError> {
            if *self.fail.lock().unwrap() {
                return Err(StoreError::Io {
                    path: "flaky.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            *self.stored.lock().unwrap() = Some(readings.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_open_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = open_in(&dir);
        assert!(manager.get_all().is_empty());
        assert_eq!(manager.username(), "alice");
    }

    #[test]
    fn test_add_is_last_and_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);

        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let added = manager
            .add(WaterReading::new("Reef".to_string(), 8.0, 26.0, 0.0))
            .unwrap()
            .clone();

        assert_eq!(manager.get_all().last(), Some(&added));
        let on_disk = read_file(&repository);
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk.last(), Some(&added));
    }

    #[test]
    fn test_reopen_sees_persisted_readings() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let expected = manager.get_all().to_vec();
        drop(manager);

        let (manager, _) = open_in(&dir);
        assert_eq!(manager.get_all(), expected.as_slice());
    }

    #[test]
    fn test_clear_persists_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();

        manager.clear().unwrap();

        assert!(manager.get_all().is_empty());
        assert!(read_file(&repository).is_empty());
    }

    #[test]
    fn test_delete_by_timestamp_removes_all_matches() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        manager.add(reading("Reef", "2024-01-01 10:00")).unwrap();
        manager.add(reading("Tank1", "2024-01-02 10:00")).unwrap();

        let removed = manager
            .delete(&ReadingKey::Timestamp("2024-01-01 10:00".to_string()))
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(manager.get_all().len(), 1);
        assert_eq!(read_file(&repository).len(), 1);
    }

    #[test]
    fn test_delete_by_id_removes_one() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let id = manager.add(reading("Reef", "2024-01-01 10:00")).unwrap().id;

        assert_eq!(manager.delete(&ReadingKey::Id(id)).unwrap(), 1);
        assert_eq!(manager.get_all()[0].name, "Tank1");
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();

        let result = manager.delete(&ReadingKey::Timestamp("1999-01-01 00:00".to_string()));
        assert!(matches!(result, Err(ManagerError::NotFound(_))));
        assert_eq!(manager.get_all().len(), 1);
    }

    #[test]
    fn test_update_rewrites_only_target() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let id = manager.add(reading("Reef", "2024-01-02 10:00")).unwrap().id;

        let edit = ReadingEdit {
            name: "Reef".to_string(),
            ph: 8.2,
            temperature: 27.0,
            ammonia: 0.3,
        };
        let updated = manager.update(&ReadingKey::Id(id), edit).unwrap().clone();

        assert_eq!(updated.timestamp, "2024-01-02 10:00");
        assert_eq!(updated.ph, 8.2);
        let on_disk = read_file(&repository);
        assert_eq!(on_disk[0].ph, 7.0);
        assert_eq!(on_disk[1], updated);
    }

    #[test]
    fn test_update_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let before = read_file(&repository);

        let edit = ReadingEdit {
            name: "Tank1".to_string(),
            ph: 14.5,
            temperature: 25.0,
            ammonia: 0.1,
        };
        let result = manager.update(&ReadingKey::Timestamp("2024-01-01 10:00".to_string()), edit);

        assert!(matches!(result, Err(ManagerError::Validation(_))));
        assert_eq!(read_file(&repository), before);
        assert_eq!(manager.get_all(), before.as_slice());
    }

    #[test]
    fn test_failed_write_rolls_back_add() {
        let repository = Arc::new(FlakyRepository::default());
        let mut manager = ReadingManager::open("bob", repository.clone()).unwrap();
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();

        *repository.fail.lock().unwrap() = true;
        assert!(manager.add(reading("Reef", "2024-01-02 10:00")).is_err());
        assert_eq!(manager.get_all().len(), 1);
    }

    #[test]
    fn test_failed_write_restores_deleted_rows_in_place() {
        let repository = Arc::new(FlakyRepository::default());
        let mut manager = ReadingManager::open("bob", repository.clone()).unwrap();
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        manager.add(reading("Reef", "2024-01-02 10:00")).unwrap();
        manager.add(reading("Tank1", "2024-01-03 10:00")).unwrap();
        let before = manager.get_all().to_vec();

        *repository.fail.lock().unwrap() = true;
        let result = manager.delete(&ReadingKey::Timestamp("2024-01-02 10:00".to_string()));

        assert!(matches!(result, Err(ManagerError::Store(_))));
        assert_eq!(manager.get_all(), before.as_slice());
    }

    #[test]
    fn test_refresh_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();

        let other = ReadingManager::open("alice", repository.clone());
        let mut other = other.unwrap();
        other.add(reading("Reef", "2024-01-02 10:00")).unwrap();

        assert_eq!(manager.get_all().len(), 1);
        assert_eq!(manager.refresh().unwrap(), 2);
    }

    #[test]
    fn test_profile_names_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        manager.add(reading("Reef", "2024-01-02 10:00")).unwrap();
        manager.add(reading("Tank1", "2024-01-03 10:00")).unwrap();

        manager.add(reading("TANK1", "2024-01-04 10:00")).unwrap();

        assert_eq!(manager.profile_names(), vec!["Tank1".to_string(), "Reef".to_string()]);
        assert_eq!(manager.readings_for("tank1").len(), 3);
    }

    const LEGACY_FILE: &str = r#"[
    {"timestamp": "2024-01-01 10:00", "name": "Tank1", "pH": 7.0, "temperature": 25.0, "ammonia": 0.1},
    {"timestamp": "2024-01-02 10:00", "name": "Reef", "pH": 8.0, "temperature": 26.0, "ammonia": 0.0}
]"#;

    #[test]
    fn test_assigned_ids_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("alice");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(user_dir.join("readings.json"), LEGACY_FILE).unwrap();

        let (mut manager, repository) = open_in(&dir);
        let ids: Vec<Uuid> = manager.get_all().iter().map(|r| r.id).collect();
        assert!(ids.iter().all(|id| !id.is_nil()));
        let on_disk: Vec<Uuid> = read_file(&repository).iter().map(|r| r.id).collect();
        assert_eq!(on_disk, ids);

        manager.refresh().unwrap();
        let (reopened, _) = open_in(&dir);
        assert_eq!(reopened.get_all().iter().map(|r| r.id).collect::<Vec<_>>(), ids);

        assert_eq!(manager.delete(&ReadingKey::Id(ids[0])).unwrap(), 1);
    }

    #[test]
    fn test_malformed_file_stops_load() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, repository) = open_in(&dir);
        manager.add(reading("Tank1", "2024-01-01 10:00")).unwrap();
        let broken = "[{\"timestamp\": \"2024-01-01 10:00\", \"name\": ";
        std::fs::write(repository.path(), broken).unwrap();

        let result = ReadingManager::open("alice", repository.clone());
        assert!(matches!(result, Err(StoreError::Parse { .. })));

        assert!(matches!(manager.refresh(), Err(StoreError::Parse { .. })));
        assert_eq!(manager.get_all().len(), 1);
        assert_eq!(std::fs::read_to_string(repository.path()).unwrap(), broken);
    }
}

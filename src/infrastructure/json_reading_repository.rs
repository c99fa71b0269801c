// JSON file repository - One readings.json per user
use crate::application::reading_repository::{ReadingRepository, ReadingStorage, StoreError};
use crate::domain::reading::WaterReading;
use crate::infrastructure::json_file::{ensure_dir, read_json, write_json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const READINGS_FILE: &str = "readings.json";

#[derive(Debug, Clone)]
pub struct JsonReadingRepository {
    path: PathBuf,
}

impl JsonReadingRepository {
    /// Binds to `<root>/<username>/readings.json`, creating the directory and
    /// an empty array if nothing is there yet.
    pub fn open(root: &Path, username: &str) -> Result<Self, StoreError> {
        let user_dir = root.join(username);
        ensure_dir(&user_dir)?;

        let repository = Self {
            path: user_dir.join(READINGS_FILE),
        };
        if !repository.path.exists() {
            tracing::debug!("Creating {}", repository.path.display());
            write_json(&repository.path, &Vec::<WaterReading>::new())?;
        }
        Ok(repository)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingRepository for JsonReadingRepository {
    fn load(&self) -> Result<Option<Vec<WaterReading>>, StoreError> {
        read_json(&self.path)
    }

    fn save(&self, readings: &[WaterReading]) -> Result<(), StoreError> {
        write_json(&self.path, readings)?;
        tracing::debug!("Wrote {} readings to {}", readings.len(), self.path().display());
        Ok(())
    }
}

/// Root directory holding one sub-directory per user.
#[derive(Debug, Clone)]
pub struct JsonReadingStorage {
    root: PathBuf,
}

impl JsonReadingStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ReadingStorage for JsonReadingStorage {
    fn open(&self, username: &str) -> Result<Arc<dyn ReadingRepository>, StoreError> {
        Ok(Arc::new(JsonReadingRepository::open(&self.root, username)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_open_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let repository = JsonReadingRepository::open(dir.path(), "alice").unwrap();

        assert_eq!(repository.path(), dir.path().join("alice").join("readings.json"));
        assert_eq!(repository.load().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_absent_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let repository = JsonReadingRepository::open(dir.path(), "alice").unwrap();
        fs::remove_file(repository.path()).unwrap();

        assert_eq!(repository.load().unwrap(), None);
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("alice");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(
            user_dir.join("readings.json"),
            r#"[{"timestamp": "2024-01-01 10:00:00", "name": "Tank1", "pH": 7.0, "temperature": 25.0, "ammonia": 0.1}]"#,
        )
        .unwrap();

        let repository = JsonReadingRepository::open(dir.path(), "alice").unwrap();
        let readings = repository.load().unwrap().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp, "2024-01-01 10:00:00");
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("alice");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(
            user_dir.join("readings.json"),
            r#"[{"timestamp": "2024-01-01 10:00", "name": "", "pH": 99.0, "temperature": -4.0, "ammonia": 0.1}]"#,
        )
        .unwrap();

        let repository = JsonReadingRepository::open(dir.path(), "alice").unwrap();
        let readings = repository.load().unwrap().unwrap();
        assert_eq!(readings[0].ph, 99.0);
    }

    #[test]
    fn test_saved_keys() {
        let dir = tempfile::tempdir().unwrap();
        let repository = JsonReadingRepository::open(dir.path(), "alice").unwrap();
        let reading = WaterReading::with_timestamp(
            "Tank1".to_string(),
            7.0,
            25.0,
            0.1,
            "2024-01-01 10:00".to_string(),
        );
        repository.save(&[reading]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(repository.path()).unwrap()).unwrap();
        let object = raw[0].as_object().unwrap();
        for key in ["timestamp", "name", "pH", "temperature", "ammonia", "id"] {
            assert!(object.contains_key(key), "missing {}", key);
        }
    }
}

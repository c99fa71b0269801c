// JSON credential store - username -> credential record
use crate::application::credential_repository::{CredentialRepository, Credentials};
use crate::application::reading_repository::StoreError;
use crate::infrastructure::json_file::{ensure_dir, read_json, write_json};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonCredentialStore {
    path: PathBuf,
}

impl JsonCredentialStore {
    /// Opens the store, writing `{}` if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        if !path.exists() {
            write_json(&path, &Credentials::new())?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialRepository for JsonCredentialStore {
    fn load(&self) -> Result<Credentials, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        write_json(&self.path, credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::credential_repository::CredentialRecord;

    #[test]
    fn test_open_creates_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::open(dir.path().join("users.json")).unwrap();

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{}");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::open(dir.path().join("users.json")).unwrap();

        let mut credentials = Credentials::new();
        credentials.insert("alice".to_string(), CredentialRecord::hashed("$argon2id$x".to_string()));
        store.save(&credentials).unwrap();

        assert_eq!(store.load().unwrap(), credentials);
    }
}

// User service - Registration and login
use crate::application::credential_repository::{CredentialRecord, CredentialRepository};
use crate::application::reading_manager::ReadingManager;
use crate::application::reading_repository::{ReadingStorage, StoreError};
use crate::domain::validation::{validate_credentials, ValidationErrors};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("Username already exists.")]
    UsernameExists,

    #[error("User not found.")]
    UserNotFound,

    #[error("Incorrect password.")]
    IncorrectPassword,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct UserService {
    credentials: Arc<dyn CredentialRepository>,
    storage: Arc<dyn ReadingStorage>,
    /// Serializes load-modify-save cycles on the credential file.
    write_lock: Arc<Mutex<()>>,
}

impl UserService {
    pub fn new(credentials: Arc<dyn CredentialRepository>, storage: Arc<dyn ReadingStorage>) -> Self {
        Self {
            credentials,
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stores a hashed credential and provisions the user's reading store.
    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim();
        validate_credentials(username, password)?;
        let password_hash = hash_password(password)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut users = self.credentials.load()?;
        if users.contains_key(username) {
            return Err(AuthError::UsernameExists);
        }

        users.insert(username.to_string(), CredentialRecord::hashed(password_hash));
        self.credentials.save(&users)?;
        self.storage.open(username)?;

        tracing::info!("Registered user {}", username);
        Ok(())
    }

    /// Checks the password and returns the canonical username. Plaintext
    /// credentials from older files are rewritten as hashes on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let username = username.trim();
        validate_credentials(username, password)?;

        let record = self
            .credentials
            .load()?
            .remove(username)
            .ok_or(AuthError::UserNotFound)?;

        match (record.password_hash.as_deref(), record.password.as_deref()) {
            (Some(hash), _) => {
                if !verify_password(password, hash)? {
                    return Err(AuthError::IncorrectPassword);
                }
            }
            (None, Some(plaintext)) => {
                if plaintext != password {
                    return Err(AuthError::IncorrectPassword);
                }
                self.upgrade_plaintext(username, password)?;
            }
            (None, None) => return Err(AuthError::IncorrectPassword),
        }

        tracing::info!("User {} authenticated", username);
        Ok(username.to_string())
    }

    /// Loads the reading manager of an already authenticated user.
    pub fn open_manager(&self, username: &str) -> Result<ReadingManager, AuthError> {
        let repository = self.storage.open(username)?;
        Ok(ReadingManager::open(username, repository)?)
    }

    fn upgrade_plaintext(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let password_hash = hash_password(password)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut users = self.credentials.load()?;
        // Another login may have upgraded it already.
        if let Some(record) = users.get_mut(username) {
            if record.password_hash.is_none() {
                *record = CredentialRecord::hashed(password_hash);
                self.credentials.save(&users)?;
                tracing::warn!("Upgraded plaintext credential for user {}", username);
            }
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

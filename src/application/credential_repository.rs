// Repository trait for the credential store
use crate::application::reading_repository::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One user's stored credential. `password` only appears in files written
/// before hashing was introduced and is dropped on the next save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl CredentialRecord {
    pub fn hashed(password_hash: String) -> Self {
        Self {
            password_hash: Some(password_hash),
            password: None,
        }
    }
}

pub type Credentials = BTreeMap<String, CredentialRecord>;

pub trait CredentialRepository: Send + Sync {
    fn load(&self) -> Result<Credentials, StoreError>;
    fn save(&self, credentials: &Credentials) -> Result<(), StoreError>;
}

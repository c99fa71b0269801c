// Repository trait for per-user reading storage
use crate::domain::reading::WaterReading;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait ReadingRepository: Send + Sync {
    /// Load every stored reading, oldest first. `None` means nothing has
    /// been stored yet.
    fn load(&self) -> Result<Option<Vec<WaterReading>>, StoreError>;

    /// Replace the stored readings wholesale.
    fn save(&self, readings: &[WaterReading]) -> Result<(), StoreError>;
}

/// Hands out the reading store of a given user, provisioning it if needed.
pub trait ReadingStorage: Send + Sync {
    fn open(&self, username: &str) -> Result<Arc<dyn ReadingRepository>, StoreError>;
}

//! Per-origin key/value persistence, shaped like browser local storage.

mod file;
mod memory;

use std::sync::Arc;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Browsers cap local storage at roughly five megabytes per origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug)]
pub enum StorageError {
    /// The write would push the origin past its quota.
    QuotaExceeded { needed: usize, quota: usize },
    /// Storage is switched off (private browsing and friends).
    Unavailable,
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::QuotaExceeded { needed, quota } => {
                write!(f, "storage quota exceeded ({} of {} bytes)", needed, quota)
            }
            StorageError::Unavailable => write!(f, "storage is unavailable"),
            StorageError::Io(e) => write!(f, "storage io error: {}", e),
            StorageError::Encode(e) => write!(f, "storage encode error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Encode(e)
    }
}

impl StorageError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to an origin's storage.
pub type Storage = Arc<dyn KeyValueStore>;

/// Bytes an entry occupies, counted as UTF-16 code units the way browsers do.
pub(crate) fn entry_cost(key: &str, value: &str) -> usize {
    (key.encode_utf16().count() + value.encode_utf16().count()) * 2
}

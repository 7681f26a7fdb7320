//! Durable key-value storage for cart snapshots.
//!
//! Each cart store owns one namespace and writes its whole state there after
//! every mutation. Snapshots are wrapped in a versioned envelope so that a
//! store can discard data written by an incompatible build.

use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Version written into every snapshot envelope.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Namespace contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid storage namespace: {0:?}")]
    InvalidNamespace(String),
}

/// Key-value storage holding one serialized snapshot per namespace.
pub trait CartStorage: Send + Sync {
    /// Read the snapshot stored under `namespace`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn load(&self, namespace: &str) -> Result<Option<String>, StorageError>;

    /// Replace the snapshot stored under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn save(&self, namespace: &str, snapshot: &str) -> Result<(), StorageError>;

    /// Delete the snapshot stored under `namespace`. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, namespace: &str) -> Result<(), StorageError>;
}

/// Versioned wrapper around a store's persisted state.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEnvelope<T> {
    pub state: T,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
}

/// Serialize `state` into an envelope and write it under `namespace`.
///
/// Failures are logged, never returned: cart mutations succeed even when the
/// snapshot cannot be written.
pub fn persist<T: Serialize>(storage: &dyn CartStorage, namespace: &str, state: &T) {
    let envelope = SnapshotEnvelope {
        state,
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
    };

    let json = match serde_json::to_string(&envelope) {
        Ok(json) => json,
        Err(e) => {
            warn!(namespace, error = %e, "Failed to serialize cart snapshot");
            return;
        }
    };

    if let Err(e) = storage.save(namespace, &json) {
        warn!(namespace, error = %e, "Failed to persist cart snapshot");
    }
}

/// Read and decode the snapshot under `namespace`.
///
/// Missing, unreadable, corrupt and wrong-version snapshots all yield `None`
/// so that a bad snapshot never prevents startup.
pub fn restore<T: DeserializeOwned>(storage: &dyn CartStorage, namespace: &str) -> Option<T> {
    let raw = match storage.load(namespace) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(namespace, error = %e, "Failed to read cart snapshot");
            return None;
        }
    };

    match serde_json::from_str::<SnapshotEnvelope<T>>(&raw) {
        Ok(envelope) if envelope.version == SNAPSHOT_VERSION => Some(envelope.state),
        Ok(envelope) => {
            warn!(
                namespace,
                version = envelope.version,
                expected = SNAPSHOT_VERSION,
                "Discarding cart snapshot with unsupported version"
            );
            None
        }
        Err(e) => {
            warn!(namespace, error = %e, "Discarding corrupt cart snapshot");
            None
        }
    }
}

fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidNamespace(namespace.to_string()))
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Stores each namespace as `<root>/<namespace>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file-backed storage rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this storage.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str) -> Result<PathBuf, StorageError> {
        validate_namespace(namespace)?;
        Ok(self.root.join(format!("{namespace}.json")))
    }
}

impl CartStorage for FileStorage {
    fn load(&self, namespace: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(namespace)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, namespace: &str, snapshot: &str) -> Result<(), StorageError> {
        let path = self.path_for(namespace)?;
        fs::create_dir_all(&self.root)?;

        // Write-then-rename so readers never observe a partial snapshot
        let tmp = self.root.join(format!(".{namespace}.json.tmp"));
        fs::write(&tmp, snapshot)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(namespace)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, namespace: &str) -> Result<Option<String>, StorageError> {
        validate_namespace(namespace)?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(namespace).cloned())
    }

    fn save(&self, namespace: &str, snapshot: &str) -> Result<(), StorageError> {
        validate_namespace(namespace)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), snapshot.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<(), StorageError> {
        validate_namespace(namespace)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(namespace);
        Ok(())
    }
}

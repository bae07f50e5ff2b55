//! Durable key/value storage backing the local store
//!
//! Each key holds one whole JSON document and is always rewritten in full.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

pub trait DurableStorage: Send + Sync {
    /// Read a key; `None` when it was never written or has been removed.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the contents of a key.
    fn save(&self, key: &str, contents: &str) -> Result<(), StorageError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DurableStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        // Write beside the target and rename so readers never see half a file.
        // Synced before the rename; a crash must not leave an empty target.
        let target = self.path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &target)?;
        debug!(key, bytes = contents.len(), "Persisted key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` and `remove` fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
    }
}

impl DurableStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries()?.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert!(storage.load("workout-sessions").unwrap().is_none());

        storage.save("workout-sessions", "[1,2,3]").unwrap();
        assert_eq!(storage.load("workout-sessions").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(!dir.path().join("workout-sessions.json.tmp").exists());

        storage.save("workout-sessions", "[]").unwrap();
        assert_eq!(storage.load("workout-sessions").unwrap().as_deref(), Some("[]"));

        storage.remove("workout-sessions").unwrap();
        assert!(storage.load("workout-sessions").unwrap().is_none());
        // Removing twice is fine
        storage.remove("workout-sessions").unwrap();
    }

    #[test]
    fn test_save_replaces_leftover_temp_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save("nutrition-meals", "[\"old\"]").unwrap();

        // an interrupted save leaves a longer temp file behind
        let tmp = dir.path().join("nutrition-meals.json.tmp");
        fs::write(&tmp, "[\"partial write that never finished\"").unwrap();

        storage.save("nutrition-meals", "[]").unwrap();
        assert_eq!(storage.load("nutrition-meals").unwrap().as_deref(), Some("[]"));
        assert!(!tmp.exists());
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested).unwrap();
        storage.save("body-stats", "[]").unwrap();
        assert!(nested.join("body-stats.json").exists());
    }

    #[test]
    fn test_memory_storage_write_failures() {
        let storage = MemoryStorage::new();
        storage.save("nutrition-goals", "{}").unwrap();

        storage.set_fail_writes(true);
        assert!(storage.save("nutrition-goals", "{\"x\":1}").is_err());
        assert!(storage.remove("nutrition-goals").is_err());
        assert_eq!(storage.load("nutrition-goals").unwrap().as_deref(), Some("{}"));

        storage.set_fail_writes(false);
        storage.remove("nutrition-goals").unwrap();
        assert!(!storage.contains("nutrition-goals"));
    }
}

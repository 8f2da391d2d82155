//! Key-value backends for the TTL cache
//!
//! A backend maps string keys to serialized entries. `MemoryStorage` keeps
//! them in a process-local map; `DiskStorage` persists each entry as a JSON
//! file so cached content survives between runs.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The entry could not be serialized
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key to string value store
///
/// Implementations must be safe to share between tasks. No method may block
/// on anything other than local I/O.
pub trait Storage: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; absent keys are not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key
    fn clear(&self) -> Result<(), StorageError>;

    /// Lists the stored keys in no particular order
    fn keys(&self) -> Vec<String>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written entry
        // behind, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// Persists entries as JSON files on disk
///
/// Files live in an XDG-compliant cache directory (`~/.cache/folio/` on
/// Linux). Keys are percent-encoded into file names, so keys such as
/// `blog?page=2&tag=rust` are safe to use.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl DiskStorage {
    /// Creates a DiskStorage using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "folio")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a DiskStorage rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Returns the path to the file backing `key`
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", urlencoding::encode(key)))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Iterates over the cache files, skipping anything that isn't ours
    fn entry_files(&self) -> Vec<(PathBuf, String)> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        dir.filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let stem = path.file_name()?.to_str()?.strip_suffix(".json")?;
                let key = urlencoding::decode(stem).ok()?.into_owned();
                Some((path, key))
            })
            .collect()
    }
}

impl Storage for DiskStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;

        // Each writer gets its own sibling temp file, renamed over the entry
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.entry_path(key)).map_err(|err| err.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        for (path, _) in self.entry_files() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entry_files().into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_storage() -> (DiskStorage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage = DiskStorage::with_dir(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    #[test]
    fn test_memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.get("a").is_none());

        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").as_deref(), Some("1"));

        storage.set("a", "2").unwrap();
        assert_eq!(storage.get("a").as_deref(), Some("2"));

        storage.remove("a").unwrap();
        assert!(storage.get("a").is_none());

        // Removing an absent key is fine
        storage.remove("a").unwrap();
    }

    #[test]
    fn test_memory_storage_clear_and_keys() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();

        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        storage.clear().unwrap();
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_disk_write_creates_file_in_cache_directory() {
        let (storage, temp_dir) = create_test_storage();

        storage.set("profile", "{\"name\":\"X\"}").expect("Write should succeed");

        let expected_path = temp_dir.path().join("profile.json");
        assert!(expected_path.exists(), "Cache file should exist");
        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert_eq!(content, "{\"name\":\"X\"}");
    }

    #[test]
    fn test_disk_read_returns_none_for_missing_key() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.get("nonexistent_key").is_none());
    }

    #[test]
    fn test_disk_keys_with_query_characters_are_encoded() {
        let (storage, temp_dir) = create_test_storage();
        let key = "blog?page=2&tag=rust/async";

        storage.set(key, "[]").expect("Write should succeed");

        assert_eq!(storage.get(key).as_deref(), Some("[]"));
        assert_eq!(storage.keys(), vec![key.to_string()]);

        // Everything lands directly in the cache directory
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_disk_concurrent_writes_to_one_key_never_tear() {
        let (storage, temp_dir) = create_test_storage();
        let storage = Arc::new(storage);
        let values: Vec<String> = ["a", "b"]
            .iter()
            .map(|tag| serde_json::to_string(&vec![*tag; 50_000]).unwrap())
            .collect();

        for _ in 0..10 {
            let writers: Vec<_> = values
                .iter()
                .cloned()
                .map(|value| {
                    let storage = Arc::clone(&storage);
                    std::thread::spawn(move || storage.set("profile", &value))
                })
                .collect();
            for writer in writers {
                writer.join().unwrap().expect("Concurrent write should succeed");
            }

            let stored = storage.get("profile").expect("Entry should exist");
            assert!(values.contains(&stored), "Entry should be one whole value");
        }

        // No temp files are left behind
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_disk_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let storage = DiskStorage::with_dir(nested_path.clone());

        storage.set("nested_key", "1").expect("Write should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists(), "Cache file should exist");
    }

    #[test]
    fn test_disk_remove_missing_key_is_ok() {
        let (storage, _temp_dir) = create_test_storage();
        storage.remove("never_written").expect("Remove should be a no-op");
    }

    #[test]
    fn test_disk_clear_leaves_foreign_files_alone() {
        let (storage, temp_dir) = create_test_storage();
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "keep me").unwrap();

        storage.clear().expect("Clear should succeed");

        assert!(storage.keys().is_empty());
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_disk_clear_on_missing_directory_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::with_dir(temp_dir.path().join("missing"));
        storage.clear().expect("Clear should succeed");
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(storage) = DiskStorage::new() {
            let path_str = storage.dir().to_string_lossy();
            assert!(path_str.contains("folio"), "Cache path should contain project name");
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}

use crate::constants::paths;
use crate::error::DataSightError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable string key-value storage. Values are whole serialized records;
/// every write replaces the previous value (last write wins).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DataSightError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DataSightError>;
    fn remove(&self, key: &str) -> Result<(), DataSightError>;
}

/// Serialize `value` as JSON and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), DataSightError> {
    let contents = serde_json::to_string(value)?;
    store.set(key, &contents)
}

/// Load and decode the record under `key`.
///
/// A missing key is `None`. A record that cannot be read or decoded is
/// treated as absent: it is logged and `None` is returned, so callers start
/// from an empty state instead of failing.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, "failed to read stored record, starting empty: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, "stored record is corrupt, starting empty: {}", e);
            None
        }
    }
}

/// One JSON file per key under a base directory.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_dir`, creating it if needed.
    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Result<Self, DataSightError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            DataSightError::Storage(format!("Failed to create data directory: {}", e))
        })?;

        Ok(Self { base_dir })
    }

    /// `<data dir>/datasight/`, used when no directory is configured.
    pub fn default_dir() -> Result<PathBuf, DataSightError> {
        let data = dirs::data_dir().ok_or_else(|| {
            DataSightError::Config("Could not determine data directory".to_string())
        })?;

        Ok(data.join(paths::DATA_DIR))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, DataSightError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DataSightError::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.base_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, DataSightError> {
        let path = self.key_path(key)?;

        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&path).map(Some).map_err(|e| {
            DataSightError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DataSightError> {
        let path = self.key_path(key)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            DataSightError::Storage(format!("Failed to write temporary file: {}", e))
        })?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            DataSightError::Storage(format!("Failed to rename {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DataSightError> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                DataSightError::Storage(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, DataSightError> {
        self.entries
            .lock()
            .map_err(|_| DataSightError::Storage("in-memory store poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DataSightError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DataSightError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DataSightError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_dir(dir.path()).unwrap();

        assert_eq!(store.get("datasetMemory").unwrap(), None);
        store.set("datasetMemory", "[1,2]").unwrap();
        assert_eq!(store.get("datasetMemory").unwrap().as_deref(), Some("[1,2]"));
        assert!(dir.path().join("datasetMemory.json").exists());
        assert!(!dir.path().join("datasetMemory.json.tmp").exists());

        store.remove("datasetMemory").unwrap();
        assert_eq!(store.get("datasetMemory").unwrap(), None);
        // Removing a missing key is fine.
        store.remove("datasetMemory").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_dir(dir.path()).unwrap();
        assert!(matches!(store.set("../escape", "x"), Err(DataSightError::Storage(_))));
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_load_json_treats_corrupt_record_as_absent() {
        let store = InMemoryStore::new();
        store.set("k", "{not json").unwrap();
        let loaded: Option<Vec<u32>> = load_json(&store, "k");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load_json() {
        let store = InMemoryStore::new();
        save_json(&store, "k", &vec![3u32, 4]).unwrap();
        let loaded: Option<Vec<u32>> = load_json(&store, "k");
        assert_eq!(loaded, Some(vec![3, 4]));
    }
}

//! Session Storage - client-local key-value persistence
//!
//! Every batch operation is a single persistence write, so a token and its
//! user blob are always written or erased together.

use agencydesk_core::{storage_error, AgencyResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Client-local key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AgencyResult<Option<String>>;

    /// Write all entries in one persistence operation
    fn set_many(&self, entries: &[(&str, &str)]) -> AgencyResult<()>;

    /// Remove all keys in one persistence operation
    fn remove_many(&self, keys: &[&str]) -> AgencyResult<()>;
}

/// In-process store, used for tests and ephemeral hosts
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry without counting it as a write
    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    /// Number of batch writes performed so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> AgencyResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> AgencyResult<()> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AgencyResult<()> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// JSON object file in the data directory, replaced atomically on every write
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    const FILE_NAME: &'static str = "session.json";

    /// Open (or lazily create) the store inside `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> AgencyResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            storage_error!(
                format!("Failed to create data dir {}", data_dir.display()),
                "file_kv_store",
                e
            )
        })?;

        let path = data_dir.join(Self::FILE_NAME);
        info!("Session storage initialized at: {}", path.display());

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_content(&self) -> AgencyResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            storage_error!(
                format!("Failed to read {}", self.path.display()),
                "file_kv_store",
                e
            )
        })?;

        Ok(Some(content).filter(|c| !c.trim().is_empty()))
    }

    fn read_all(&self) -> AgencyResult<BTreeMap<String, String>> {
        match self.read_content()? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Current entries as the base of a write; an unparseable file is replaced
    fn read_for_update(&self) -> AgencyResult<BTreeMap<String, String>> {
        let Some(content) = self.read_content()? else {
            return Ok(BTreeMap::new());
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session file is corrupt, overwriting it"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> AgencyResult<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        std::fs::write(&tmp, json).map_err(|e| {
            storage_error!(
                format!("Failed to write {}", tmp.display()),
                "file_kv_store",
                e
            )
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            storage_error!(
                format!("Failed to replace {}", self.path.display()),
                "file_kv_store",
                e
            )
        })?;

        debug!("Persisted {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> AgencyResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> AgencyResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all = self.read_for_update()?;
        for (key, value) in entries {
            all.insert(key.to_string(), value.to_string());
        }
        self.write_all(&all)
    }

    fn remove_many(&self, keys: &[&str]) -> AgencyResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all = self.read_for_update()?;
        for key in keys {
            all.remove(*key);
        }
        self.write_all(&all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_counts_batches() {
        let store = MemoryKeyValueStore::new();
        store.set_many(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));

        store.remove_many(&["a", "b"]).unwrap();
        assert_eq!(store.write_count(), 2);
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileKeyValueStore::new(dir.path()).unwrap();
        assert!(store.get("staff_token").unwrap().is_none());
        store
            .set_many(&[("staff_token", "abc"), ("admin_token", "xyz")])
            .unwrap();
        drop(store);

        let reopened = FileKeyValueStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("staff_token").unwrap().as_deref(), Some("abc"));

        reopened.remove_many(&["staff_token"]).unwrap();
        assert!(reopened.get("staff_token").unwrap().is_none());
        assert_eq!(reopened.get("admin_token").unwrap().as_deref(), Some("xyz"));
        assert!(!reopened.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.get("staff_token").is_err());
    }

    #[test]
    fn test_file_store_writes_over_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        store.remove_many(&["staff_token", "staff_user"]).unwrap();
        assert!(store.get("staff_token").unwrap().is_none());

        store.set_many(&[("admin_token", "xyz")]).unwrap();
        assert_eq!(store.get("admin_token").unwrap().as_deref(), Some("xyz"));
    }
}

//! Key-value persistence backing players and settings.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;
use tracing::warn;

/// Default file name for the store inside the data directory.
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// Synchronous string key-value store that survives restarts.
pub trait KeyValueStore {
    /// Return the stored value, if any.
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store kept in one JSON object on disk.
///
/// Every `set` rewrites the whole file through a temporary file in the same
/// directory, so a crash never leaves a half-written store behind.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. Missing or unreadable files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Discarding unreadable store {}: {err:#}", path.display());
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let serialised = serde_json::to_vec_pretty(entries).context("failed to serialize store")?;
        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        temp.write_all(&serialised)
            .context("failed to write temporary store")?;
        temp.persist(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        // the cache only changes once the file is on disk
        self.write_entries(&updated)?;
        *entries = updated;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let entries = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(entries)
}

/// Store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(DEFAULT_STORE_FILE);

        let store = JsonFileStore::open(&path);
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.get("isMuted"), None);
        store.set("isMuted", "true")?;
        store.set("darkMode", "false")?;
        assert!(path.exists());

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("isMuted").as_deref(), Some("true"));
        assert_eq!(reopened.get("darkMode").as_deref(), Some("false"));
        Ok(())
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_replaced_on_write() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(DEFAULT_STORE_FILE);
        fs::write(&path, "{ not json")?;

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("multiPlayers"), None);
        store.set("multiPlayers", "[]")?;

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("multiPlayers").as_deref(), Some("[]"));
        Ok(())
    }

    #[test]
    fn failed_write_leaves_cached_value_untouched() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory")?;
        let store = JsonFileStore::open(blocker.join(DEFAULT_STORE_FILE));

        assert!(store.set("isMuted", "true").is_err());
        assert_eq!(store.get("isMuted"), None);
        Ok(())
    }

    #[test]
    fn memory_store_overwrites_values() -> Result<()> {
        let store = MemoryStore::new();
        store.set("k", "1")?;
        store.set("k", "2")?;
        assert_eq!(store.get("k").as_deref(), Some("2"));
        Ok(())
    }
}

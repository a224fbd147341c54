use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::warn;
use tokio::sync::watch;

/// String-keyed persisted settings with coarse change notifications: any
/// write marks every watcher, regardless of key.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    /// Receiver marked changed whenever any key is written.
    fn watch(&self) -> watch::Receiver<()>;
}

/// In-process store for hosts without persistence and for tests.
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    notify: watch::Sender<()>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = watch::channel(());
        Self {
            values: Mutex::new(HashMap::new()),
            notify,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        let _ = self.notify.send(());
    }

    fn watch(&self) -> watch::Receiver<()> {
        self.notify.subscribe()
    }
}

/// File-backed store holding a single JSON object of string keys.
///
/// Loading tolerates a missing or malformed file; every write persists
/// immediately.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
    notify: watch::Sender<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        let (notify, _) = watch::channel(());
        Self {
            path,
            values: Mutex::new(values),
            notify,
        }
    }

    fn lock_values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, values: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(values) {
            Ok(content) => {
                if let Err(error) = std::fs::write(&self.path, content) {
                    warn!("Failed to persist settings to {}: {error}", self.path.display());
                }
            }
            Err(error) => warn!("Failed to encode settings: {error}"),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock_values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.lock_values();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
        drop(values);
        let _ = self.notify.send(());
    }

    fn watch(&self) -> watch::Receiver<()> {
        self.notify.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, MemoryStore, SettingsStore};

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();

        assert!(store.get("missing").is_none());

        store.set("key", "value");
        assert_eq!(store.get("key").as_deref(), Some("value"));

        store.set("key", "replaced");
        assert_eq!(store.get("key").as_deref(), Some("replaced"));
    }

    #[test]
    fn any_write_marks_watchers_changed() {
        let store = MemoryStore::new();
        let rx = store.watch();

        assert!(!rx.has_changed().expect("sender should be alive"));

        store.set("unrelated", "value");
        assert!(rx.has_changed().expect("sender should be alive"));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("settings.json");

        let store = JsonFileStore::open(path.clone());
        store.set("key", "value");
        drop(store);

        let reopened = JsonFileStore::open(path);
        assert_eq!(reopened.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn file_store_tolerates_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");

        let missing = JsonFileStore::open(dir.path().join("absent.json"));
        assert!(missing.get("key").is_none());

        let malformed_path = dir.path().join("broken.json");
        std::fs::write(&malformed_path, "{not json").expect("test file should be written");
        let malformed = JsonFileStore::open(malformed_path);
        assert!(malformed.get("key").is_none());

        malformed.set("key", "value");
        assert_eq!(malformed.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn file_store_creates_parent_directories_on_write() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileStore::open(path.clone());
        store.set("key", "value");

        assert!(path.is_file());
    }
}

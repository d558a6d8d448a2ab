//! Locally persisted favorites
//!
//! Favorites are a JSON array of asset ids stored under a single key of an
//! injected [`KeyValueStore`]. Every operation reads storage fresh, and
//! nothing here ever returns an error: unreadable or corrupt storage is an
//! empty set, and failed writes are logged.

use crate::{constants::FAVORITES_KEY, error::StorageError, types::FavoriteOutcome};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Minimal string key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if missing or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Replaces the stored value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-process store; contents vanish with the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // readers never observe a partially written file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Ordered, duplicate-free list of favorite asset ids
pub struct FavoritesStore<S> {
    storage: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Favorites kept in `storage` under the `favorites` key
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Current favorites, read from storage at call time
    pub fn list(&self) -> Vec<String> {
        let Some(raw) = self.storage.get(FAVORITES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt favorites in storage, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.list().iter().any(|fav| fav == id)
    }

    /// Appends `id` unless already present
    ///
    /// A failed write is logged and still reports `Added`; the id is then
    /// missing from the next `list()`.
    pub fn add(&self, id: &str) -> FavoriteOutcome {
        let mut ids = self.list();
        if ids.iter().any(|fav| fav == id) {
            tracing::debug!(asset = id, "Already a favorite");
            return FavoriteOutcome::AlreadyPresent;
        }

        ids.push(id.to_string());
        if self.persist(&ids) {
            tracing::debug!(asset = id, count = ids.len(), "Added favorite");
        } else {
            tracing::warn!(asset = id, "Favorite reported as added but not stored");
        }
        FavoriteOutcome::Added
    }

    /// Removes every occurrence of `id`; absent ids are a no-op
    pub fn remove(&self, id: &str) {
        let ids = self.list();
        let remaining: Vec<String> = ids.iter().filter(|fav| *fav != id).cloned().collect();
        if remaining.len() == ids.len() {
            return;
        }

        if self.persist(&remaining) {
            tracing::debug!(asset = id, count = remaining.len(), "Removed favorite");
        }
    }

    /// Writes `ids` back; `false` when the write failed
    fn persist(&self, ids: &[String]) -> bool {
        let result = serde_json::to_string(ids)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.set(FAVORITES_KEY, &raw));

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist favorites");
                false
            }
        }
    }
}

//! Local key-value persistence for the anonymous cart.
//!
//! [`KeyValueStore`] abstracts a synchronous string store (browser local
//! storage, a data directory, or memory). [`LocalCartStore`] keeps the cart
//! snapshot under one namespaced key as a JSON array of line items.

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use dukicks_core::CartSnapshot;
use tracing::{debug, warn};

use super::StorageError;

/// A synchronous string key-value store.
///
/// Anonymous cart mutations call `set` with the cart lock held and on the
/// async runtime's thread, so implementations should be quick. The file
/// backend does blocking I/O and an fsync per write; that is accepted for a
/// single small entry.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is refused or fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory key-value store with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    /// Create an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects values larger than `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: RwLock::default(),
            quota: Some(limit),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota
            && value.len() > limit
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size: value.len(),
                limit,
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Key-value store that keeps one file per key in a directory.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// LocalCartStore
// =============================================================================

/// Persists the anonymous cart under a single namespaced key.
#[derive(Clone)]
pub struct LocalCartStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl std::fmt::Debug for LocalCartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCartStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl LocalCartStore {
    /// Create a cart store over `store` using `namespace` as the key.
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Key the cart is stored under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Load the stored cart, distinguishing "absent" from "unreadable".
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON and any
    /// backend read error.
    pub fn try_load(&self) -> Result<Option<CartSnapshot>, StorageError> {
        let Some(raw) = self.store.get(&self.namespace)? else {
            return Ok(None);
        };
        let snapshot: CartSnapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    /// Load the stored cart, treating absent or unreadable data as empty.
    ///
    /// A corrupt entry is left in place; the next [`save`](Self::save)
    /// overwrites it.
    #[must_use]
    pub fn load(&self) -> CartSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                debug!(namespace = %self.namespace, lines = snapshot.len(), "Loaded local cart");
                snapshot
            }
            Ok(None) => CartSnapshot::empty(),
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    error = %e,
                    parse_error = e.is_parse_error(),
                    "Discarding unreadable local cart"
                );
                CartSnapshot::empty()
            }
        }
    }

    /// Serialize and store `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set(&self.namespace, &raw)
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend write fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.namespace)
    }
}

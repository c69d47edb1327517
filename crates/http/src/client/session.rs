//! Credential storage
//!
//! The access and refresh credentials live in a small key-value store that is
//! handed to the client at construction. Two implementations are provided: an
//! in-memory map and a JSON file that survives restarts.

use super::ClientError;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Storage key of the short-lived access credential
pub const ACCESS_TOKEN_KEY: &str = "access";

/// Storage key of the refresh credential
pub const REFRESH_TOKEN_KEY: &str = "refresh";

/// Durable key-value store for session credentials
pub trait SessionStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Insert or replace a value
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Remove every stored value
    fn clear(&self) -> Result<(), ClientError>;

    fn access_token(&self) -> Result<Option<String>, ClientError> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Result<Option<String>, ClientError> {
        self.get(REFRESH_TOKEN_KEY)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ClientError> {
    mutex
        .lock()
        .map_err(|_| ClientError::Storage("session store lock poisoned".into()))
}

/// Session store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding an access/refresh pair
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let mut values = BTreeMap::new();
        if let Some(access) = access {
            values.insert(ACCESS_TOKEN_KEY.to_string(), access.to_string());
        }
        if let Some(refresh) = refresh {
            values.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
        }
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        lock(&self.values)?.clear();
        Ok(())
    }
}

/// Session store persisted as a JSON object on disk
///
/// The file is read once on open and rewritten in full on every change, via a
/// temporary sibling file and a rename so a crash never leaves half a file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(err) => {
                return Err(ClientError::Storage(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store at the platform default location
    pub fn open_default() -> Result<Self, ClientError> {
        Self::open(Self::default_path()?)
    }

    /// `session.json` inside the platform data directory
    pub fn default_path() -> Result<PathBuf, ClientError> {
        let dirs = ProjectDirs::from("app", "Peerza", "peerza").ok_or_else(|| {
            ClientError::Storage("could not determine a home directory".into())
        })?;
        Ok(dirs.data_dir().join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                ClientError::Storage(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|err| {
            ClientError::Storage(format!("failed to write {}: {err}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| {
            warn!("Failed to replace session file: {err}");
            ClientError::Storage(format!("failed to replace {}: {err}", self.path.display()))
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = lock(&self.values)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut values = lock(&self.values)?;
        values.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::Storage(format!(
                "failed to remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_get_set_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.access_token().unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "A1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "R1").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));

        store.set(ACCESS_TOKEN_KEY, "A2").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A2"));

        store.clear().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");

        let store = FileSessionStore::open(&path).unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        store.set(ACCESS_TOKEN_KEY, "A1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "R1").unwrap();
        drop(store);

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");

        let store = FileSessionStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "A1").unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.access_token().unwrap(), None);

        // Clearing an already empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileSessionStore::open(&path);
        assert!(matches!(result, Err(ClientError::Serialization(_))));
    }
}

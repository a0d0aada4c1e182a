//! Session record persistence.
//!
//! The record is the opaque user payload the server returns on a successful
//! authentication. It is replaced wholesale on every successful auth event and
//! never merged. Stores are plain string key-value maps.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which the serialized session record is stored.
pub const SESSION_KEY: &str = "userInfo";

/// String key-value storage owned by the host application.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
    #[error("session storage io failure at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Server-issued identity payload plus the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: Value,
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user: Value) -> Self {
        Self {
            user,
            saved_at: Utc::now(),
        }
    }

    pub fn to_text(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(raw: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overwrite whatever record is stored under [`SESSION_KEY`].
    pub fn persist<S>(&self, store: &S) -> Result<(), StoreError>
    where
        S: SessionStore + ?Sized,
    {
        store.set(SESSION_KEY, self.to_text()?)
    }

    pub fn load<S>(store: &S) -> Result<Option<Self>, StoreError>
    where
        S: SessionStore + ?Sized,
    {
        store
            .get(SESSION_KEY)?
            .map(|raw| Self::from_text(&raw))
            .transpose()
    }
}

/// Process-local store used by tests and the stub-backed demo.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl InMemorySessionStore {
    /// Keys passed to `set`, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("session mutex poisoned").clone()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.values.lock().expect("session mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .insert(key.to_string(), value);
        self.writes
            .lock()
            .expect("session mutex poisoned")
            .push(key.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .remove(key);
        Ok(())
    }
}

/// JSON map on disk, written with owner-only permissions on unix.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| self.io(source))?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(map)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|source| self.io(source))?;
            // `mode` only applies on create; tighten files that already existed.
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|source| self.io(source))?;
            file.write_all(contents.as_bytes())
                .map_err(|source| self.io(source))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|source| self.io(source))?;
            file.write_all(contents.as_bytes())
                .map_err(|source| self.io(source))?;
        }

        Ok(())
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

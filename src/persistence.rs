//! Persistence layer for session records
//!
//! The session managers write every refreshed credential through a
//! [`SessionStore`]. Two adapters are provided: a JSON file holding a
//! key/value map, and an in-memory map for embedding and tests.

use crate::error::{EkiwiError, Result};
use crate::logging::get_logger;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Store key for the transport auth session record
pub const AUTH_SESSION_KEY: &str = "electrickiwi-auth-session-object";

/// Store key for the customer session record
pub const CUSTOMER_SESSION_KEY: &str = "electrickiwi-customer-object";

/// Durable key/value persistence for credential records
pub trait SessionStore: Send + Sync {
    /// Read the record stored under `key`
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` under `key`, replacing any previous record
    fn save(&self, key: &str, value: Value) -> Result<()>;

    /// Delete the record under `key`; absent keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Session store backed by a single pretty-printed JSON object on disk
pub struct FileSessionStore {
    file_path: PathBuf,
    // Serialises read-modify-write cycles on the file
    write_lock: Mutex<()>,
    logger: crate::logging::StructuredLogger,
}

impl FileSessionStore {
    /// Create a new file store; the file is created on first save
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            logger: get_logger("persistence"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.file_path.exists() {
            return Ok(Map::new());
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(EkiwiError::config(format!(
                "Session store {} does not contain a JSON object",
                self.file_path.display()
            ))),
        }
    }

    fn write_all(&self, all: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file first so a crash never leaves half a record
        let tmp = self.file_path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&Value::Object(all))?)?;
        std::fs::rename(&tmp, &self.file_path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let mut all = self.read_all()?;
        let value = all.remove(key).filter(|v| !v.is_null());
        if value.is_none() {
            self.logger.debug(&format!("No stored record for '{}'", key));
        }
        Ok(value)
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EkiwiError::io("Session store lock poisoned"))?;

        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);
        self.write_all(all)?;

        self.logger.debug(&format!("Saved record '{}' to session store", key));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EkiwiError::io("Session store lock poisoned"))?;

        let mut all = self.read_all()?;
        if all.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(all)?;

        self.logger.debug(&format!("Removed record '{}' from session store", key));
        Ok(())
    }
}

/// Session store kept in process memory
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing record
    pub fn with_record(self, key: &str, value: Value) -> Self {
        if let Ok(mut records) = self.records.write() {
            records.insert(key.to_string(), value);
        }
        self
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .read()
            .map_err(|_| EkiwiError::io("Session store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EkiwiError::io("Session store lock poisoned"))?;
        records.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| EkiwiError::io("Session store lock poisoned"))?;
        records.remove(key);
        Ok(())
    }
}

//! Memory providers used to persist ACL containers
//!
//! A provider is a small key/value store of JSON values. Containers write
//! their snapshot under a single key when synced and read it back when a
//! provider is attached.

use crate::error::{AuthError, Result};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key/value persistence backend
pub trait MemoryProvider: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value
    fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a value, returning whether it existed
    fn forget(&self, key: &str) -> Result<bool>;

    /// Flush pending writes to the backing store
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Provider that only lives as long as the process
#[derive(Debug, Default)]
pub struct RuntimeMemory {
    values: RwLock<HashMap<String, Value>>,
}

impl RuntimeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl MemoryProvider for RuntimeMemory {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool> {
        Ok(self.values.write().remove(key).is_some())
    }
}

/// Provider backed by a single JSON object on disk
///
/// Values are held in memory and written out on [`finish`](MemoryProvider::finish).
/// The file is replaced by writing a sibling temp file and renaming it.
#[derive(Debug)]
pub struct JsonFileMemory {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileMemory {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&raw)? {
                    Value::Object(map) => map,
                    other => {
                        return Err(AuthError::Storage(format!(
                            "{} must contain a JSON object, found {}",
                            path.display(),
                            type_name(&other)
                        )))
                    }
                }
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = values.len(), "Opened JSON memory");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemoryProvider for JsonFileMemory {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool> {
        Ok(self.values.write().remove(key).is_some())
    }

    fn finish(&self) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(&*self.values.read())?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, encoded)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "Flushed JSON memory");
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

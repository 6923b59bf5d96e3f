use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::HostError;

/// Key/value persistence supplied by the host (extension storage, a JSON file, ...).
pub trait SettingsBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Value>, HostError>;
    fn write(&self, key: &str, value: Value) -> Result<(), HostError>;
    fn remove(&self, key: &str) -> Result<(), HostError>;
}

/// In-process backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: Mutex::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.values.lock() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        keys.sort();
        keys
    }
}

impl SettingsBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Value>, HostError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, value: Value) -> Result<(), HostError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| HostError::Storage(e.to_string()))?;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HostError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| HostError::Storage(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Every key lives in one JSON object on disk.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config dir>/autopip/settings.json` when the platform has a config dir.
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autopip").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<Map<String, Value>, HostError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(HostError::Storage(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(HostError::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(HostError::Storage(e.to_string())),
        }
    }

    fn store_map(&self, map: &Map<String, Value>) -> Result<(), HostError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HostError::Storage(e.to_string()))?;
        }
        let body = serde_json::to_string_pretty(map).map_err(|e| HostError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| HostError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| HostError::Storage(e.to_string()))
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, HostError>) -> Result<T, HostError> {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f()
    }
}

impl SettingsBackend for JsonFileBackend {
    fn read(&self, key: &str) -> Result<Option<Value>, HostError> {
        self.with_lock(|| Ok(self.load_map()?.get(key).cloned()))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), HostError> {
        self.with_lock(|| {
            let mut map = self.load_map()?;
            map.insert(key.to_string(), value);
            self.store_map(&map)
        })
    }

    fn remove(&self, key: &str) -> Result<(), HostError> {
        self.with_lock(|| {
            let mut map = self.load_map()?;
            if map.remove(key).is_some() {
                self.store_map(&map)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_backend_read_write_remove() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.read("a").unwrap(), None);
        backend.write("a", json!(1)).unwrap();
        assert_eq!(backend.read("a").unwrap(), Some(json!(1)));
        backend.remove("a").unwrap();
        assert_eq!(backend.read("a").unwrap(), None);
    }

    #[test]
    fn test_file_backend_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let backend = JsonFileBackend::new(&path);
        backend.write("k", json!({"x": 1})).unwrap();
        backend.write("other", json!("v")).unwrap();

        let reopened = JsonFileBackend::new(&path);
        assert_eq!(reopened.read("k").unwrap(), Some(json!({"x": 1})));
        assert_eq!(reopened.read("other").unwrap(), Some(json!("v")));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_backend_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("absent.json"));
        assert_eq!(backend.read("anything").unwrap(), None);
        backend.remove("anything").unwrap();
    }

    #[test]
    fn test_file_backend_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let backend = JsonFileBackend::new(&path);
        assert!(matches!(backend.read("k"), Err(HostError::Storage(_))));
    }
}

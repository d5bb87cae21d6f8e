//! Key/value preference persistence.
//!
//! Values are opaque strings (callers store JSON). `FileStore` keeps every
//! key in one JSON object on disk; `MemoryStore` is shared in-process state
//! used by tests and by sessions without a writable data directory.
use std::{
    collections::{BTreeMap, HashMap},
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::{de::DeserializeOwned, Serialize};

pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Corrupt(String),
    Encode(String),
    Poisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "preference storage i/o failed: {error}"),
            Self::Corrupt(message) => write!(f, "stored preference is corrupt: {message}"),
            Self::Encode(message) => write!(f, "failed to encode preference: {message}"),
            Self::Poisoned => write!(f, "preference store lock was poisoned"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|error| StorageError::Corrupt(format!("{}: {error}", self.path.display()))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Corrupt(message)) => {
                log::warn!("discarding unreadable preferences ({message})");
                BTreeMap::new()
            }
            Err(error) => return Err(error),
        };
        map.insert(key.to_string(), value.to_string());

        let contents = serde_json::to_string_pretty(&map)
            .map_err(|error| StorageError::Encode(error.to_string()))?;
        write_document(&self.path, &contents)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<HashMap<String, String>>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.0.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.0.lock().map_err(|_| StorageError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and decodes a JSON preference. Missing keys, unreadable storage and
/// corrupt values all come back as `None`; the latter two are logged.
pub fn load_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = match store.load(key) {
        Ok(raw) => raw?,
        Err(error) => {
            log::warn!("could not read preference `{key}`: {error}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("ignoring corrupt preference `{key}`: {error}");
            None
        }
    }
}

/// Encodes and writes a JSON preference, logging failures.
pub fn save_json<T: Serialize>(store: &mut dyn PreferenceStore, key: &str, value: &T) -> bool {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(error) => {
            log::warn!("could not encode preference `{key}`: {error}");
            return false;
        }
    };

    match store.save(key, &encoded) {
        Ok(()) => true,
        Err(error) => {
            log::warn!("could not write preference `{key}`: {error}");
            false
        }
    }
}

pub fn write_document(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "xmbfolio-storage-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn memory_store_clones_share_state() {
        let mut writer = MemoryStore::new();
        let reader = writer.clone();
        writer.save("key", "\"value\"").expect("save");
        assert_eq!(reader.load("key").expect("load").as_deref(), Some("\"value\""));
        assert_eq!(reader.load("missing").expect("load"), None);
    }

    #[test]
    fn file_store_round_trips_multiple_keys() {
        let dir = scratch_dir("round-trip");
        let mut store = FileStore::in_dir(&dir);
        assert_eq!(store.load("a").expect("empty load"), None);

        store.save("a", "1").expect("save a");
        store.save("b", "true").expect("save b");

        let reopened = FileStore::in_dir(&dir);
        assert_eq!(reopened.load("a").expect("load a").as_deref(), Some("1"));
        assert_eq!(reopened.load("b").expect("load b").as_deref(), Some("true"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_reported_then_replaced_on_save() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(dir.join(PREFERENCES_FILE), "{ nope").expect("write");

        let mut store = FileStore::in_dir(&dir);
        assert!(matches!(store.load("a"), Err(StorageError::Corrupt(_))));

        store.save("a", "2").expect("save over corrupt file");
        assert_eq!(store.load("a").expect("load").as_deref(), Some("2"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_json_values_load_as_none() {
        let mut store = MemoryStore::new();
        store.save("flag", "not json").expect("save");
        assert_eq!(load_json::<bool>(&store, "flag"), None);

        assert!(save_json(&mut store, "flag", &true));
        assert_eq!(load_json::<bool>(&store, "flag"), Some(true));
    }
}

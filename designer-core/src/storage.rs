//! Keyed blob storage for persisted history.
//!
//! The history manager writes one JSON document per storage key. Two
//! backends are provided: [`MemoryStorage`] (shared in-process map) and
//! [`FileStorage`] (one `<key>.json` file per key in a directory).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::StorageError;

/// A keyed store of JSON documents.
pub trait HistoryStorage: fmt::Debug {
    /// Read the document under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `document` under `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, key: &str, document: &str) -> Result<(), StorageError>;

    /// Delete the document under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    documents: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut keys: Vec<String> = documents.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(documents.get(key).cloned())
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        documents.insert(key.to_string(), document.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        documents.remove(key);
        Ok(())
    }
}

/// Filesystem storage: one `<key>.json` per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for storage, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl HistoryStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), document)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Replace any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.load("k").expect("load").is_none());

        storage.save("k", "{}").expect("save");
        assert_eq!(storage.load("k").expect("load").as_deref(), Some("{}"));

        storage.remove("k").expect("remove");
        assert!(storage.load("k").expect("load").is_none());
    }

    #[test]
    fn test_memory_storage_clones_share_state() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.save("a", "1").expect("save");
        assert_eq!(handle.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("history")).expect("storage");

        storage.save("page/main", r#"{"x":1}"#).expect("save");
        let path = storage.path_for("page/main");
        assert!(path.exists(), "document should be written to disk");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("page_main.json"));

        let reopened = FileStorage::new(storage.dir()).expect("reopen");
        assert_eq!(
            reopened.load("page/main").expect("load").as_deref(),
            Some(r#"{"x":1}"#)
        );
    }

    #[test]
    fn test_file_storage_missing_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path()).expect("storage");
        assert!(storage.load("nothing").expect("load").is_none());
        storage.remove("nothing").expect("removing a missing key succeeds");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my-design_1"), "my-design_1");
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }
}

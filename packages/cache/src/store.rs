//! Raw string-keyed persistence backends.
//!
//! [`Persistence`] is the port the rest of the monitor depends on. The
//! [`FileStore`] keeps one JSON file per key under a data directory;
//! [`MemoryStore`] keeps everything in a map and is what tests use.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::CacheError;

/// String-keyed storage of serialized values.
pub trait Persistence: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Persistence for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (or creates) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        crate::paths::ensure_dir(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Maps a key to a file-system safe stem. ASCII alphanumerics, `-` and
/// `_` pass through; every other byte is written as `%XX`.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}

impl Persistence for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        // One temp file per write; several processes may write the same key.
        let tmp = self.dir.join(format!(
            "{}.{}.tmp",
            file_stem(key),
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

//! File-backed storage.
//!
//! One JSON file per key under a cache directory. Writes go to a hidden
//! temporary file first and are renamed into place, so a crash never leaves
//! a half-written entry behind.

use skul_sync_engine::{Error, KeyValueStorage};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

const EXTENSION: &str = ".json";

type EngineResult<T> = skul_sync_engine::error::Result<T>;

#[derive(Debug)]
struct FileInner {
    root: PathBuf,
    quota_bytes: Option<u64>,
    write_lock: Mutex<()>,
}

/// [`KeyValueStorage`] over a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<FileInner>,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>, quota_bytes: Option<u64>) -> EngineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::Storage(format!("failed to create cache directory {}: {e}", root.display()))
        })?;

        Ok(Self {
            inner: Arc::new(FileInner {
                root,
                quota_bytes,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Bytes used by stored entries.
    pub fn used_bytes(&self) -> EngineResult<u64> {
        let mut total = 0;
        for key in self.keys()? {
            total += self.entry_size(&key)?;
        }
        Ok(total)
    }

    fn path_for(&self, key: &str) -> EngineResult<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\', '\0']) {
            return Err(Error::Storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.inner.root.join(format!("{key}{EXTENSION}")))
    }

    fn entry_size(&self, key: &str) -> EngineResult<u64> {
        match fs::metadata(self.path_for(key)?) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> EngineResult<()> {
        let path = self.path_for(key)?;
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.inner.quota_bytes {
            let projected = self.used_bytes()? - self.entry_size(key)? + value.len() as u64;
            if projected > quota {
                return Err(Error::StorageQuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        let tmp = self.inner.root.join(format!(".{key}.tmp"));
        fs::write(&tmp, value).map_err(|e| io_error(key, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(key, e));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> EngineResult<()> {
        let path = self.path_for(key)?;
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn keys(&self) -> EngineResult<Vec<String>> {
        let entries = fs::read_dir(&self.inner.root).map_err(|e| {
            Error::Storage(format!(
                "failed to list cache directory {}: {e}",
                self.inner.root.display()
            ))
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Storage(e.to_string()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(EXTENSION) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn io_error(key: &str, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => Error::StorageQuotaExceeded {
            key: key.to_string(),
        },
        _ => Error::Storage(format!("'{key}': {err}")),
    }
}

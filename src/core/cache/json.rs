//! JSON file cache backend for persistent storage.
//!
//! Each entry lives in its own `<content hash>.json` file, so workers
//! writing different entries never contend. Writes land in a temporary file
//! that is renamed into place, which keeps concurrent writers of the same
//! hash from exposing a half-written entry.

use super::{CacheBackend, CacheEntry, CacheStats, ContentHash};
use crate::error::CacheError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

/// Directory of JSON entry files
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    /// Open or create a cache directory
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        fs::create_dir_all(dir).map_err(|e| CacheError::OpenFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Cache directory: {}", dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the entry for `hash`
    pub fn entry_path(&self, hash: &ContentHash) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, ENTRY_EXTENSION))
    }

    /// All entry files currently in the directory
    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_entry(path: &Path) -> Result<CacheEntry, CacheError> {
        let bytes = fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn remove(path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error deleting cache file {}: {}", path.display(), e);
                false
            }
        }
    }
}

impl CacheBackend for JsonFileCache {
    fn get(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(hash);

        let entry = match Self::read_entry(&path) {
            Ok(entry) => entry,
            Err(CacheError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        if &entry.content_hash != hash {
            return Err(CacheError::Corrupted {
                path,
                reason: format!("entry is for {}", entry.content_hash),
            });
        }

        Ok(Some(entry))
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let path = self.entry_path(&entry.content_hash);
        let json = serde_json::to_vec_pretty(&entry)
            .map_err(|e| CacheError::SerializationFailed(e.to_string()))?;

        let io_error = |source: io::Error| CacheError::Io {
            path: path.clone(),
            source,
        };

        let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        staged.write_all(&json).map_err(io_error)?;
        staged.persist(&path).map_err(|e| io_error(e.error))?;

        Ok(())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        Ok(self
            .entry_files()?
            .iter()
            .filter(|path| Self::remove(path))
            .count())
    }

    fn prune(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
        let mut removed = 0;

        for path in self.entry_files()? {
            let stale = match Self::read_entry(&path) {
                Ok(entry) => !keep(&entry),
                Err(e) => {
                    debug!("Pruning unreadable cache entry: {}", e);
                    true
                }
            };

            if stale && Self::remove(&path) {
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn stats(&self, is_valid: &dyn Fn(&CacheEntry) -> bool) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();

        for path in self.entry_files()? {
            stats.total_entries += 1;
            stats.total_size_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            match Self::read_entry(&path) {
                Ok(entry) if is_valid(&entry) => stats.valid_entries += 1,
                _ => stats.expired_entries += 1,
            }
        }

        Ok(stats)
    }
}

//! In-memory cache backend for testing.

use super::{CacheBackend, CacheEntry, CacheStats, ContentHash};
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// In-memory cache backend
///
/// Useful for testing and scenarios where persistence isn't needed.
pub struct InMemoryCache {
    entries: RwLock<HashMap<ContentHash, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Corrupted {
            path: PathBuf::from("memory"),
            reason: "lock poisoned".to_string(),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryCache {
    fn get(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(hash).cloned())
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(entry.content_hash.clone(), entry);
        Ok(())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn prune(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let before = entries.len();
        entries.retain(|_, entry| keep(entry));
        Ok(before - entries.len())
    }

    fn stats(&self, is_valid: &dyn Fn(&CacheEntry) -> bool) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;

        let total_entries = entries.len();
        let valid_entries = entries.values().filter(|e| is_valid(e)).count();
        // Size of the entry as it would be persisted
        let total_size_bytes: u64 = entries
            .values()
            .map(|e| serde_json::to_vec(e).map(|v| v.len() as u64).unwrap_or(0))
            .sum();

        Ok(CacheStats {
            total_entries,
            valid_entries,
            expired_entries: total_entries - valid_entries,
            total_size_bytes,
        })
    }
}

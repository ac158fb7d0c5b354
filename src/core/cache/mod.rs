//! # Cache Module
//!
//! Persists decode results so unchanged files are never decoded twice.
//!
//! ## Keying
//! Entries are keyed by the SHA-256 of the file's bytes, not its path:
//! renamed or copied files reuse the cached decode, and the cache survives
//! process restarts.
//!
//! ## Expiry
//! An entry is served while its own age is below the TTL (24 hours by
//! default). File modification times are never consulted. There is no
//! other invalidation; `clear` is the only way to force a re-decode.
//!
//! ## Failure policy
//! The cache is an optimization. Every read or write failure is logged and
//! turned into a miss or a no-op; nothing here fails a decode.
//!
//! ## Backends
//! - `JsonFileCache` - One JSON file per entry on disk
//! - `InMemoryCache` - For testing

mod json;
mod memory;
mod traits;

pub use json::JsonFileCache;
pub use memory::InMemoryCache;
pub use traits::CacheBackend;

use crate::core::detection::Detection;
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Files are hashed in chunks of this size, so memory use is constant
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 of a file's full contents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Stream a file through SHA-256
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(Self::from_digest(&hasher.finalize()))
    }

    /// Hash an in-memory buffer
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::from_digest(&Sha256::digest(bytes))
    }

    fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted decode result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was written
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Path the content was first decoded from (informational only)
    #[serde(rename = "image_path")]
    pub source_path: PathBuf,
    /// Key of the entry
    #[serde(rename = "file_hash")]
    pub content_hash: ContentHash,
    /// Deduplicated detections
    pub results: Vec<Detection>,
}

impl CacheEntry {
    /// Whether the entry is younger than `ttl` at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.created_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age < ttl,
            // A TTL too large for chrono never expires
            Err(_) => true,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Entries younger than the TTL
    pub valid_entries: usize,
    /// Entries past the TTL, including unreadable ones
    pub expired_entries: usize,
    /// Storage used by all entries
    pub total_size_bytes: u64,
}

/// Content-addressed, TTL-bounded result cache.
///
/// Constructed once and shared (usually behind an `Arc`) with everything
/// that decodes. A disabled cache misses on every lookup and ignores
/// stores.
pub struct ResultCache {
    backend: Option<Box<dyn CacheBackend>>,
    ttl: Duration,
}

impl ResultCache {
    /// Wrap a backend
    pub fn new(backend: Box<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
        }
    }

    /// Open a persistent cache in `directory`
    pub fn persistent(directory: &Path, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self::new(Box::new(JsonFileCache::open(directory)?), ttl))
    }

    /// A cache that lives only as long as this value
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Box::new(InMemoryCache::new()), ttl)
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached results for the file at `path`, if fresh
    pub fn get(&self, path: &Path) -> Option<Vec<Detection>> {
        self.get_at(path, Utc::now())
    }

    /// [`get`](Self::get) evaluated at `now`
    pub fn get_at(&self, path: &Path, now: DateTime<Utc>) -> Option<Vec<Detection>> {
        self.backend.as_ref()?;
        let hash = match ContentHash::of_file(path) {
            Ok(hash) => hash,
            Err(e) => {
                debug!("Cannot hash {} for cache lookup: {}", path.display(), e);
                return None;
            }
        };
        self.lookup_at(&hash, now)
    }

    /// Cached results for already-hashed content, if fresh
    pub fn lookup(&self, hash: &ContentHash) -> Option<Vec<Detection>> {
        self.lookup_at(hash, Utc::now())
    }

    /// [`lookup`](Self::lookup) evaluated at `now`
    pub fn lookup_at(&self, hash: &ContentHash, now: DateTime<Utc>) -> Option<Vec<Detection>> {
        let backend = self.backend.as_ref()?;

        match backend.get(hash) {
            Ok(Some(entry)) if entry.is_fresh_at(now, self.ttl) => {
                debug!("Cache hit: {} ({} result(s))", hash, entry.results.len());
                Some(entry.results)
            }
            Ok(Some(entry)) => {
                debug!("Cache expired: {} (created {})", hash, entry.created_at);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Error reading cache: {}", e);
                None
            }
        }
    }

    /// Remember `results` for the file at `path`
    pub fn set(&self, path: &Path, results: &[Detection]) {
        self.set_at(path, results, Utc::now());
    }

    /// [`set`](Self::set) with an explicit creation time
    pub fn set_at(&self, path: &Path, results: &[Detection], now: DateTime<Utc>) {
        if self.backend.is_none() {
            return;
        }
        match ContentHash::of_file(path) {
            Ok(hash) => self.store_at(&hash, path, results, now),
            Err(e) => warn!("Cannot hash {} for caching: {}", path.display(), e),
        }
    }

    /// Remember `results` for already-hashed content
    pub fn store(&self, hash: &ContentHash, source_path: &Path, results: &[Detection]) {
        self.store_at(hash, source_path, results, Utc::now());
    }

    /// [`store`](Self::store) with an explicit creation time
    pub fn store_at(
        &self,
        hash: &ContentHash,
        source_path: &Path,
        results: &[Detection],
        now: DateTime<Utc>,
    ) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let entry = CacheEntry {
            created_at: now,
            source_path: source_path.to_path_buf(),
            content_hash: hash.clone(),
            results: results.to_vec(),
        };

        match backend.set(entry) {
            Ok(()) => debug!("Cached {} result(s) for {}", results.len(), source_path.display()),
            Err(e) => warn!("Error writing cache: {}", e),
        }
    }

    /// Delete every entry, returning how many were removed
    pub fn clear(&self) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        match backend.clear() {
            Ok(count) => {
                info!("Cleared {} cache entries", count);
                count
            }
            Err(e) => {
                warn!("Error clearing cache: {}", e);
                0
            }
        }
    }

    /// Delete entries older than the TTL
    pub fn clear_expired(&self) -> usize {
        self.clear_expired_at(Utc::now())
    }

    /// [`clear_expired`](Self::clear_expired) evaluated at `now`
    pub fn clear_expired_at(&self, now: DateTime<Utc>) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let ttl = self.ttl;
        match backend.prune(&|entry: &CacheEntry| entry.is_fresh_at(now, ttl)) {
            Ok(count) => {
                info!("Cleared {} expired cache entries", count);
                count
            }
            Err(e) => {
                warn!("Error clearing expired cache entries: {}", e);
                0
            }
        }
    }

    /// Entry counts and storage size
    pub fn stats(&self) -> CacheStats {
        self.stats_at(Utc::now())
    }

    /// [`stats`](Self::stats) evaluated at `now`
    pub fn stats_at(&self, now: DateTime<Utc>) -> CacheStats {
        let Some(backend) = self.backend.as_ref() else {
            return CacheStats::default();
        };
        let ttl = self.ttl;
        backend
            .stats(&|entry: &CacheEntry| entry.is_fresh_at(now, ttl))
            .unwrap_or_else(|e| {
                warn!("Error reading cache statistics: {}", e);
                CacheStats::default()
            })
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish()
    }
}

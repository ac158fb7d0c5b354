//! Cache backend trait definition.

use super::{CacheEntry, CacheStats, ContentHash};
use crate::error::CacheError;

/// Trait for cache backends
///
/// Backends only store and enumerate entries; expiry policy lives in
/// `ResultCache` and reaches the backend as predicates.
pub trait CacheBackend: Send + Sync {
    /// Get the entry stored for `hash`, regardless of age
    fn get(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, replacing any entry with the same hash
    fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove all entries
    ///
    /// Returns the number of entries removed.
    fn clear(&self) -> Result<usize, CacheError>;

    /// Remove every entry for which `keep` returns false, plus any entry
    /// that can no longer be read
    ///
    /// Returns the number of entries removed.
    fn prune(&self, keep: &dyn Fn(&CacheEntry) -> bool) -> Result<usize, CacheError>;

    /// Get cache statistics, counting entries accepted by `is_valid` as valid
    fn stats(&self, is_valid: &dyn Fn(&CacheEntry) -> bool) -> Result<CacheStats, CacheError>;
}

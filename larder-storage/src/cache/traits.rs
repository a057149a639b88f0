//! Cache backend trait and statistics.
//!
//! A backend stores opaque bytes under region-scoped keys with a per-entry
//! time-to-live. It knows nothing about codecs or entity types; those are
//! layered on top by [`CacheStore`](super::CacheStore).

use std::time::Duration;

use async_trait::async_trait;
use larder_core::LarderResult;

use super::region_key::RegionScopedKey;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe for concurrent use from many tasks.
///
/// # Expiry
///
/// TTL is enforced here, never by callers: whatever `get` returns is
/// authoritative for "is this entry live". Expired entries may be dropped
/// lazily on read or by an active sweep.
///
/// # Errors
///
/// A backend that cannot be reached reports `CacheError::Unavailable` (or
/// `CacheError::Timeout`) instead of pretending the key is absent.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Get the stored bytes for a key if present and not expired.
    async fn get(&self, key: &RegionScopedKey) -> LarderResult<Option<Vec<u8>>>;

    /// Store bytes under a key, replacing any previous entry.
    ///
    /// The entry expires `ttl` after this call.
    async fn put(&self, key: &RegionScopedKey, bytes: Vec<u8>, ttl: Duration) -> LarderResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn evict(&self, key: &RegionScopedKey) -> LarderResult<()>;

    /// Remove every entry in a region, returning how many were dropped.
    async fn invalidate_region(&self, region: &str) -> LarderResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> LarderResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live entry.
    pub hits: u64,
    /// Number of reads that found nothing (including expired entries).
    pub misses: u64,
    /// Number of live or not-yet-swept entries.
    pub entry_count: u64,
    /// Number of entries dropped because their TTL ran out.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}

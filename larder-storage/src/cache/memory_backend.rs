//! In-process cache backend with per-entry expiry.
//!
//! Entries live in a sharded concurrent map keyed by the encoded
//! [`RegionScopedKey`]. Expiry is lazy (an expired entry is dropped by the
//! read that finds it) and can also be swept actively with
//! [`MemoryCacheBackend::purge_expired`] or a background
//! [`MemoryCacheBackend::spawn_sweeper`] task.
//!
//! Time comes from `tokio::time::Instant`, so tests can drive expiry with a
//! paused clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use larder_core::LarderResult;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::region_key::RegionScopedKey;
use super::traits::{CacheBackend, CacheStats};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

enum Lookup {
    Live(Vec<u8>),
    Expired,
    Missing,
}

/// Shared in-memory cache backend.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry now, returning how many were removed.
    pub fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut removed = 0u64;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        if removed > 0 {
            self.expirations.fetch_add(removed, Ordering::Relaxed);
            tracing::debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Run [`purge_expired`](Self::purge_expired) every `period` until the
    /// returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let backend = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                backend.purge_expired();
            }
        })
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &RegionScopedKey) -> LarderResult<Option<Vec<u8>>> {
        let encoded = key.encode();
        let now = Instant::now();

        let lookup = match self.entries.get(&encoded) {
            Some(entry) if entry.is_live(now) => Lookup::Live(entry.bytes.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Missing,
        };

        match lookup {
            Lookup::Live(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(bytes))
            }
            Lookup::Expired => {
                // A concurrent put may have refreshed the entry since the read.
                if self
                    .entries
                    .remove_if(&encoded, |_, entry| !entry.is_live(now))
                    .is_some()
                {
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Missing => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &RegionScopedKey, bytes: Vec<u8>, ttl: Duration) -> LarderResult<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.encode(), Entry { bytes, expires_at });
        Ok(())
    }

    async fn evict(&self, key: &RegionScopedKey) -> LarderResult<()> {
        self.entries.remove(&key.encode());
        Ok(())
    }

    async fn invalidate_region(&self, region: &str) -> LarderResult<u64> {
        let prefix = RegionScopedKey::region_prefix(region);
        let mut removed = 0u64;
        self.entries.retain(|key, _| {
            let keep = !key.starts_with(&prefix);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            expirations: self.expirations.load(Ordering::Relaxed),
        })
    }
}

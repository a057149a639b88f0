//! Fetch provenance counters.
//!
//! Two independent monotonic counters: reads served by the authoritative
//! store and reads served by the cache. Increments are lock-free atomics and
//! never lose updates.
//!
//! [`MetricsCounters::reset`] is not synchronized with in-flight fetches: an
//! increment that lands between the two stores of a reset survives it, and an
//! increment racing the store of its own counter may be lost. Callers only
//! rely on counts from a quiet point onwards.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of both counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub store_fetches: u64,
    pub cache_hits: u64,
}

/// Concurrency-safe store-fetch and cache-hit counters.
#[derive(Debug, Default)]
pub struct MetricsCounters {
    store_fetches: AtomicU64,
    cache_hits: AtomicU64,
}

impl MetricsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read served by the store, returning the new count.
    pub fn increment_store_fetch(&self) -> u64 {
        self.store_fetches.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a read served by the cache, returning the new count.
    pub fn increment_cache_hit(&self) -> u64 {
        self.cache_hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn store_fetches(&self) -> u64 {
        self.store_fetches.load(Ordering::SeqCst)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::SeqCst)
    }

    /// Read both counters. The two loads are not atomic as a pair.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            store_fetches: self.store_fetches(),
            cache_hits: self.cache_hits(),
        }
    }

    /// Zero both counters.
    pub fn reset(&self) {
        self.store_fetches.store(0, Ordering::SeqCst);
        self.cache_hits.store(0, Ordering::SeqCst);
    }
}

//! Cache-aside orchestration for items.
//!
//! [`ItemCacheService`] decides, for every read, whether the cache can answer
//! or the entity store must, populates the cache after a store read, and
//! evicts after a write. The cache is never refreshed inline on write; the
//! next read repopulates it.
//!
//! Concurrent misses for the same id may both reach the store and both write
//! the cache. The last write wins.

use std::sync::Arc;

use larder_core::{
    FetchResult, Item, ItemDraft, ItemId, LarderConfig, LarderError, LarderResult,
};
use larder_storage::{open_backend, CacheBackend, CacheStore, EntityStore, RegionRegistry};
use tracing::{debug, info, warn};

use crate::counters::{CounterSnapshot, MetricsCounters};

/// Cache-aside service over one cache region and one entity store.
///
/// Cloning is cheap; clones share the cache, the store and the counters.
pub struct ItemCacheService<B, S>
where
    B: CacheBackend + ?Sized,
    S: EntityStore + ?Sized,
{
    cache: CacheStore<B>,
    store: Arc<S>,
    counters: Arc<MetricsCounters>,
    region: String,
}

impl<B, S> Clone for ItemCacheService<B, S>
where
    B: CacheBackend + ?Sized,
    S: EntityStore + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
            region: self.region.clone(),
        }
    }
}

impl<S> ItemCacheService<dyn CacheBackend, S>
where
    S: EntityStore + ?Sized,
{
    /// Open the configured backend and regions and bind them to `store`.
    pub fn from_config(config: &LarderConfig, store: Arc<S>) -> LarderResult<Self> {
        config.validate()?;
        let backend = open_backend(&config.cache)?;
        let cache = CacheStore::new(backend, RegionRegistry::from_config(&config.cache));
        Self::new(
            cache,
            store,
            Arc::new(MetricsCounters::new()),
            config.cache.item_region.clone(),
        )
    }
}

impl<B, S> ItemCacheService<B, S>
where
    B: CacheBackend + ?Sized,
    S: EntityStore + ?Sized,
{
    /// Create a service reading and writing `region`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::RegionUnconfigured` if `region` is not registered
    /// in the cache store.
    pub fn new(
        cache: CacheStore<B>,
        store: Arc<S>,
        counters: Arc<MetricsCounters>,
        region: impl Into<String>,
    ) -> LarderResult<Self> {
        let region = region.into();
        let ttl = cache.region(&region)?.ttl();
        info!(
            region = %region,
            ttl_secs = ttl.as_secs_f64(),
            backend = cache.backend().name(),
            "Item cache service ready"
        );
        Ok(Self {
            cache,
            store,
            counters,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn cache(&self) -> &CacheStore<B> {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read an item, serving from the cache when possible.
    ///
    /// - Cache hit: the cache-hit counter is incremented and reported with
    ///   the current store-fetch count.
    /// - Cache miss, found in store: the store-fetch counter is incremented,
    ///   then the item is written to the cache with the region TTL.
    /// - Not found anywhere: no counter changes, absent entity.
    ///
    /// Cache and store failures propagate; there is no fallback read.
    #[tracing::instrument(skip_all, fields(item_id = %id, region = %self.region))]
    pub async fn fetch(&self, id: ItemId) -> LarderResult<FetchResult> {
        let key = id.cache_key();

        let cached = self
            .cache
            .get_item(&self.region, &key)
            .await
            .inspect_err(|e| log_failure("cache read", e))?;

        if let Some(item) = cached {
            let cache_hits = self.counters.increment_cache_hit();
            let store_fetches = self.counters.store_fetches();
            debug!(cache_hits, "Retrieved from cache");
            return Ok(FetchResult::from_cache(item, store_fetches, cache_hits));
        }

        let found = self
            .store
            .find(id)
            .await
            .inspect_err(|e| log_failure("store read", e))?;

        match found {
            Some(item) => {
                let store_fetches = self.counters.increment_store_fetch();
                let cache_hits = self.counters.cache_hits();
                self.cache
                    .put_item(&self.region, &key, &item)
                    .await
                    .inspect_err(|e| log_failure("cache write", e))?;
                info!(store_fetches, "Retrieved from store");
                Ok(FetchResult::from_store(item, store_fetches, cache_hits))
            }
            None => {
                let snapshot = self.counters.snapshot();
                debug!("Item not found");
                Ok(FetchResult::not_found(
                    snapshot.store_fetches,
                    snapshot.cache_hits,
                ))
            }
        }
    }

    /// Plain cache-aside read that neither touches nor reports the counters.
    #[tracing::instrument(skip_all, fields(item_id = %id, region = %self.region))]
    pub async fn fetch_uncounted(&self, id: ItemId) -> LarderResult<Option<Item>> {
        let key = id.cache_key();

        if let Some(item) = self.cache.get_item(&self.region, &key).await? {
            debug!("Retrieved from cache");
            return Ok(Some(item));
        }

        match self.store.find(id).await? {
            Some(item) => {
                self.cache.put_item(&self.region, &key, &item).await?;
                debug!("Retrieved from store");
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Persist a new item. The store assigns its id; the cache is untouched.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, draft: ItemDraft) -> LarderResult<Item> {
        let saved = self
            .store
            .save(draft.into_unsaved())
            .await
            .inspect_err(|e| log_failure("store write", e))?;
        if let Some(id) = saved.id {
            info!(item_id = %id, "Created item");
        }
        Ok(saved)
    }

    /// Replace an item and evict its cache entry.
    ///
    /// If the save fails nothing is evicted. If the eviction fails the store
    /// already holds the new value and the error is returned; the stale entry
    /// then lives until its TTL runs out.
    #[tracing::instrument(skip_all, fields(item_id = %id, region = %self.region))]
    pub async fn update(&self, id: ItemId, draft: ItemDraft) -> LarderResult<Item> {
        let saved = self
            .store
            .save(draft.into_item(id))
            .await
            .inspect_err(|e| log_failure("store write", e))?;

        self.cache
            .evict(&self.region, &id.cache_key())
            .await
            .inspect_err(|e| log_failure("cache evict", e))?;

        info!("Updated item and evicted cache entry");
        Ok(saved)
    }

    /// Zero both counters.
    pub fn reset_counters(&self) {
        self.counters.reset();
        info!("Counters reset");
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

fn log_failure(operation: &'static str, err: &LarderError) {
    warn!(operation, transient = err.is_transient(), error = %err, "Item cache operation failed");
}

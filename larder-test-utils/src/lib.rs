//! LARDER Test Utilities
//!
//! Centralized test infrastructure for the LARDER workspace:
//! - Fault-injecting cache backend and entity store doubles
//! - Proptest generators for items, fetch results and cached values
//! - Test fixtures for common scenarios
//! - Custom assertions for fetch results and error kinds

// Re-export the in-memory implementations from their source crate
pub use larder_storage::{InMemoryEntityStore, MemoryCacheBackend};

// Re-export core types for convenience
pub use larder_core::{
    CacheError, CacheSettings, CodecKind, FetchResult, Item, ItemDraft, ItemId, LarderError,
    LarderResult, Provenance, StorageError, ITEM_REGION,
};
pub use larder_service::{ItemCacheService, MetricsCounters};
pub use larder_storage::{CacheBackend, CacheStats, CachedValue, EntityStore, RegionScopedKey};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Elapsed time reported by a double switched into its timeout mode.
pub const SIMULATED_TIMEOUT: Duration = Duration::from_millis(250);

// ============================================================================
// FAULT-INJECTING DOUBLES
// ============================================================================

/// Memory cache backend that can be switched into an unavailable or a
/// timed-out state.
///
/// While faulted every operation fails with `CacheError::Unavailable` (or
/// `CacheError::Timeout`) and nothing reaches the inner backend. Timeout
/// wins when both are set.
#[derive(Debug, Default)]
pub struct FlakyCacheBackend {
    inner: MemoryCacheBackend,
    unavailable: AtomicBool,
    timed_out: AtomicBool,
    get_calls: AtomicU64,
}

impl FlakyCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }

    pub fn set_timed_out(&self, timed_out: bool) {
        self.timed_out.store(timed_out, Ordering::SeqCst);
    }

    /// Number of `get` calls, failed ones included.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryCacheBackend {
        &self.inner
    }

    fn check(&self, operation: &str) -> LarderResult<()> {
        if self.timed_out.load(Ordering::SeqCst) {
            return Err(CacheError::Timeout {
                backend: "flaky".to_string(),
                operation: operation.to_string(),
                elapsed: SIMULATED_TIMEOUT,
            }
            .into());
        }
        if self.is_unavailable() {
            return Err(CacheError::Unavailable {
                backend: "flaky".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &RegionScopedKey) -> LarderResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &RegionScopedKey, bytes: Vec<u8>, ttl: Duration) -> LarderResult<()> {
        self.check("put")?;
        self.inner.put(key, bytes, ttl).await
    }

    async fn evict(&self, key: &RegionScopedKey) -> LarderResult<()> {
        self.check("evict")?;
        self.inner.evict(key).await
    }

    async fn invalidate_region(&self, region: &str) -> LarderResult<u64> {
        self.check("invalidate_region")?;
        self.inner.invalidate_region(region).await
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        self.inner.stats().await
    }
}

/// Entity store that counts reads and can be made to fail or time out.
#[derive(Debug, Default)]
pub struct FlakyEntityStore {
    inner: InMemoryEntityStore,
    unavailable: AtomicBool,
    timed_out: AtomicBool,
    find_calls: AtomicU64,
    save_calls: AtomicU64,
}

impl FlakyEntityStore {
    pub fn new(inner: InMemoryEntityStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_timed_out(&self, timed_out: bool) {
        self.timed_out.store(timed_out, Ordering::SeqCst);
    }

    pub fn find_calls(&self) -> u64 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> u64 {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryEntityStore {
        &self.inner
    }

    fn check(&self, operation: &str) -> LarderResult<()> {
        if self.timed_out.load(Ordering::SeqCst) {
            return Err(StorageError::Timeout {
                operation: operation.to_string(),
                elapsed: SIMULATED_TIMEOUT,
            }
            .into());
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "connection pool exhausted".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FlakyEntityStore {
    async fn find(&self, id: ItemId) -> LarderResult<Option<Item>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check("find")?;
        self.inner.find(id).await
    }

    async fn save(&self, item: Item) -> LarderResult<Item> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check("save")?;
        self.inner.save(item).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating LARDER values.

    use super::*;
    use proptest::prelude::*;

    /// Generate a positive ItemId.
    pub fn arb_item_id() -> impl Strategy<Value = ItemId> {
        (1i64..1_000_000).prop_map(ItemId::new)
    }

    /// Generate an id-less item payload.
    pub fn arb_item_draft() -> impl Strategy<Value = ItemDraft> {
        ("[A-Za-z0-9 ]{1,32}", ".{0,120}")
            .prop_map(|(name, description)| ItemDraft::new(name, description))
    }

    /// Generate a persisted item.
    pub fn arb_item() -> impl Strategy<Value = Item> {
        (arb_item_id(), arb_item_draft()).prop_map(|(id, draft)| draft.into_item(id))
    }

    pub fn arb_provenance() -> impl Strategy<Value = Provenance> {
        prop_oneof![
            Just(Provenance::Cache),
            Just(Provenance::Store),
            Just(Provenance::NotFound),
        ]
    }

    /// Generate a fetch result whose entity agrees with its provenance.
    pub fn arb_fetch_result() -> impl Strategy<Value = FetchResult> {
        (arb_provenance(), arb_item(), any::<u32>(), any::<u32>()).prop_map(
            |(provenance, item, stores, hits)| {
                let (stores, hits) = (u64::from(stores), u64::from(hits));
                match provenance {
                    Provenance::Cache => FetchResult::from_cache(item, stores, hits),
                    Provenance::Store => FetchResult::from_store(item, stores, hits),
                    Provenance::NotFound => FetchResult::not_found(stores, hits),
                }
            },
        )
    }

    pub fn arb_cached_value() -> impl Strategy<Value = CachedValue> {
        prop_oneof![
            arb_item().prop_map(CachedValue::Item),
            arb_fetch_result().prop_map(CachedValue::FetchResult),
        ]
    }

    pub fn arb_codec_kind() -> impl Strategy<Value = CodecKind> {
        prop_oneof![Just(CodecKind::Binary), Just(CodecKind::Json)]
    }

    /// Generate a sequence of read ids drawn from `1..=max_id`.
    pub fn arb_read_sequence(max_id: i64, len: usize) -> impl Strategy<Value = Vec<ItemId>> {
        prop::collection::vec((1..=max_id).prop_map(ItemId::new), 1..=len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use larder_storage::{CacheStore, RegionRegistry};
    use std::sync::Arc;

    /// Service type used by most fixtures.
    pub type TestService<S = InMemoryEntityStore> = ItemCacheService<FlakyCacheBackend, S>;

    /// The item every scenario starts from.
    pub fn sample_item(id: i64) -> Item {
        Item::with_id(
            ItemId::new(id),
            format!("Item {}", id),
            format!("Description for item {}", id),
        )
    }

    /// Store holding items `1..=count` built by [`sample_item`].
    pub fn seeded_store(count: i64) -> InMemoryEntityStore {
        InMemoryEntityStore::with_items((1..=count).map(sample_item))
    }

    /// Service over a fresh [`FlakyCacheBackend`] with default settings.
    pub fn service_fixture<S: EntityStore>(store: Arc<S>) -> TestService<S> {
        service_with_settings(&CacheSettings::default(), store)
    }

    /// Service over a fresh [`FlakyCacheBackend`] with custom settings.
    pub fn service_with_settings<S: EntityStore>(
        settings: &CacheSettings,
        store: Arc<S>,
    ) -> TestService<S> {
        let cache = CacheStore::new(
            Arc::new(FlakyCacheBackend::new()),
            RegionRegistry::from_config(settings),
        );
        ItemCacheService::new(
            cache,
            store,
            Arc::new(MetricsCounters::new()),
            settings.item_region.clone(),
        )
        .expect("from_config always registers the item region")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for LARDER-specific validation.

    use super::*;

    /// Assert where a fetch was served from.
    #[track_caller]
    pub fn assert_provenance(result: &FetchResult, expected: Provenance) {
        assert_eq!(
            result.provenance(),
            expected,
            "Expected {} but result was {:?}",
            expected,
            result
        );
    }

    /// Assert the reported (store fetches, cache hits) pair.
    #[track_caller]
    pub fn assert_counts(result: &FetchResult, store_fetches: u64, cache_hits: u64) {
        assert_eq!(
            (result.store_fetch_count, result.cache_hit_count),
            (store_fetches, cache_hits),
            "Unexpected counters in {:?}",
            result
        );
    }

    /// Assert that a result is a cache-unavailable error.
    #[track_caller]
    pub fn assert_cache_unavailable<T: std::fmt::Debug>(result: &LarderResult<T>) {
        match result {
            Err(LarderError::Cache(CacheError::Unavailable { .. })) => {}
            other => panic!("Expected cache Unavailable error, got: {:?}", other),
        }
    }

    /// Assert that a result is a store-unavailable error.
    #[track_caller]
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &LarderResult<T>) {
        match result {
            Err(LarderError::Storage(StorageError::Unavailable { .. })) => {}
            other => panic!("Expected storage Unavailable error, got: {:?}", other),
        }
    }

    /// Assert that a result is a cache timeout for `operation`.
    #[track_caller]
    pub fn assert_cache_timeout<T: std::fmt::Debug>(result: &LarderResult<T>, operation: &str) {
        match result {
            Err(LarderError::Cache(CacheError::Timeout { operation: op, .. })) if op == operation => {}
            other => panic!("Expected cache Timeout during {}, got: {:?}", operation, other),
        }
    }

    /// Assert that a result is a store timeout for `operation`.
    #[track_caller]
    pub fn assert_store_timeout<T: std::fmt::Debug>(result: &LarderResult<T>, operation: &str) {
        match result {
            Err(LarderError::Storage(StorageError::Timeout { operation: op, .. }))
                if op == operation => {}
            other => panic!("Expected store Timeout during {}, got: {:?}", operation, other),
        }
    }

    /// Assert that a result is a serialization error of any kind.
    #[track_caller]
    pub fn assert_serialization_error<T: std::fmt::Debug>(result: &LarderResult<T>) {
        match result {
            Err(e) if e.is_serialization() => {}
            other => panic!("Expected serialization error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Region-aware cache access.
//!
//! [`CacheStore`] combines a byte-level [`CacheBackend`] with a
//! [`RegionRegistry`]: callers name a region and a logical key, and the store
//! applies that region's codec and TTL.

use std::sync::Arc;

use larder_core::{Item, LarderResult};

use super::region::{CacheRegion, RegionRegistry};
use super::region_key::RegionScopedKey;
use super::traits::{CacheBackend, CacheStats};
use crate::codec::CachedValue;

/// Cache handle shared by every caller of one backend.
pub struct CacheStore<B: CacheBackend + ?Sized> {
    backend: Arc<B>,
    regions: Arc<RegionRegistry>,
}

impl<B: CacheBackend + ?Sized> Clone for CacheStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            regions: Arc::clone(&self.regions),
        }
    }
}

impl<B: CacheBackend + ?Sized> CacheStore<B> {
    pub fn new(backend: Arc<B>, regions: RegionRegistry) -> Self {
        Self {
            backend,
            regions: Arc::new(regions),
        }
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    /// Resolve a region, failing with `RegionUnconfigured` for unknown names.
    pub fn region(&self, name: &str) -> LarderResult<&CacheRegion> {
        self.regions.region(name)
    }

    /// Read and decode a value.
    ///
    /// Returns `Ok(None)` when the key is absent or expired. Backend failures
    /// and undecodable payloads are errors, never a miss.
    pub async fn get(&self, region: &str, key: &str) -> LarderResult<Option<CachedValue>> {
        let region = self.regions.region(region)?;
        let scoped = RegionScopedKey::new(region.name(), key);

        match self.backend.get(&scoped).await? {
            Some(bytes) => Ok(region.codec().decode(&bytes)?),
            None => Ok(None),
        }
    }

    /// Encode and write a value with the region's TTL.
    pub async fn put(&self, region: &str, key: &str, value: &CachedValue) -> LarderResult<()> {
        let region = self.regions.region(region)?;
        let bytes = region.codec().encode(Some(value))?;
        let scoped = RegionScopedKey::new(region.name(), key);

        self.backend.put(&scoped, bytes, region.ttl()).await
    }

    /// Remove a key from a region. Absence is not an error.
    pub async fn evict(&self, region: &str, key: &str) -> LarderResult<()> {
        let region = self.regions.region(region)?;
        let scoped = RegionScopedKey::new(region.name(), key);

        self.backend.evict(&scoped).await
    }

    /// Drop every entry of a region.
    pub async fn invalidate_region(&self, region: &str) -> LarderResult<u64> {
        let region = self.regions.region(region)?;
        let removed = self.backend.invalidate_region(region.name()).await?;
        tracing::info!(region = %region.name(), removed, "Invalidated cache region");
        Ok(removed)
    }

    /// Read a cached item. A region holding a different kind under `key` is a codec error.
    pub async fn get_item(&self, region: &str, key: &str) -> LarderResult<Option<Item>> {
        match self.get(region, key).await? {
            Some(value) => Ok(Some(Item::try_from(value)?)),
            None => Ok(None),
        }
    }

    pub async fn put_item(&self, region: &str, key: &str, item: &Item) -> LarderResult<()> {
        self.put(region, key, &CachedValue::Item(item.clone())).await
    }

    pub async fn stats(&self) -> LarderResult<CacheStats> {
        self.backend.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheBackend;
    use larder_core::{
        CacheSettings, CodecError, CodecKind, FetchResult, ItemId, LarderError, ITEM_REGION,
    };
    use std::time::Duration;

    fn store_with(codec: CodecKind) -> CacheStore<MemoryCacheBackend> {
        let settings = CacheSettings {
            codec,
            ..CacheSettings::default()
        };
        CacheStore::new(
            Arc::new(MemoryCacheBackend::new()),
            RegionRegistry::from_config(&settings),
        )
    }

    fn item(id: i64, name: &str) -> Item {
        Item::with_id(ItemId::new(id), name, "desc")
    }

    #[tokio::test]
    async fn test_put_then_get_item() {
        for codec in [CodecKind::Json, CodecKind::Binary] {
            let store = store_with(codec);
            store
                .put_item(ITEM_REGION, "1", &item(1, "A"))
                .await
                .expect("put should succeed");

            let cached = store.get_item(ITEM_REGION, "1").await.expect("get should succeed");
            assert_eq!(cached, Some(item(1, "A")), "codec {codec}");
        }
    }

    #[tokio::test]
    async fn test_keys_are_region_scoped() {
        let store = store_with(CodecKind::Json);
        store.put_item(ITEM_REGION, "1", &item(1, "A")).await.unwrap();

        let raw = store
            .backend()
            .get(&RegionScopedKey::new(ITEM_REGION, "1"))
            .await
            .unwrap()
            .expect("entry should be stored under itemCache::1");
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["@type"], "Item");
        assert_eq!(json["name"], "A");
    }

    #[tokio::test]
    async fn test_unknown_region_fails() {
        let store = store_with(CodecKind::Json);
        let err = store.get("nope", "1").await.unwrap_err();
        assert!(err.is_region_unconfigured());

        let err = store.put_item("nope", "1", &item(1, "A")).await.unwrap_err();
        assert!(err.is_region_unconfigured());

        let err = store.evict("nope", "1").await.unwrap_err();
        assert!(err.is_region_unconfigured());
    }

    #[tokio::test]
    async fn test_evict() {
        let store = store_with(CodecKind::Json);
        store.put_item(ITEM_REGION, "1", &item(1, "A")).await.unwrap();
        store.evict(ITEM_REGION, "1").await.expect("evict should succeed");
        assert!(store.get_item(ITEM_REGION, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_item_of_wrong_kind() {
        let store = store_with(CodecKind::Binary);
        let value = CachedValue::FetchResult(FetchResult::not_found(0, 0));
        store.put(ITEM_REGION, "1", &value).await.unwrap();

        let err = store.get_item(ITEM_REGION, "1").await.unwrap_err();
        assert!(matches!(
            err,
            LarderError::Codec(CodecError::UnexpectedKind { .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_an_error() {
        let store = store_with(CodecKind::Json);
        store
            .backend()
            .put(
                &RegionScopedKey::new(ITEM_REGION, "1"),
                b"not json".to_vec(),
                Duration::from_secs(15),
            )
            .await
            .unwrap();

        let err = store.get(ITEM_REGION, "1").await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test(start_paused = true)]
    async fn test_region_ttl_applies() {
        let store = store_with(CodecKind::Json);
        store.put_item(ITEM_REGION, "1", &item(1, "A")).await.unwrap();

        tokio::time::advance(Duration::from_secs(16)).await;
        assert!(store.get_item(ITEM_REGION, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_region() {
        let store = store_with(CodecKind::Json);
        for id in 1..=3 {
            store
                .put_item(ITEM_REGION, &id.to_string(), &item(id, "x"))
                .await
                .unwrap();
        }
        assert_eq!(store.invalidate_region(ITEM_REGION).await.unwrap(), 3);
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
    }
}

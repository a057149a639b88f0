//! End-to-end tests for the item cache service

use std::sync::Arc;
use std::time::Duration;

use larder_core::{CacheSettings, CodecKind, ItemDraft, ItemId, LarderResult, Provenance};
use larder_service::CounterSnapshot;
use larder_test_utils::assertions::*;
use larder_test_utils::fixtures::*;
use larder_test_utils::{
    CacheBackend, CachedValue, FetchResult, FlakyEntityStore, InMemoryEntityStore, Item,
    RegionScopedKey, ITEM_REGION,
};

#[tokio::test]
async fn smoke_test_read_update_read_scenario() -> LarderResult<()> {
    let store = InMemoryEntityStore::with_items(vec![Item::with_id(
        ItemId::new(1),
        "A",
        "first",
    )]);
    let service = service_fixture(Arc::new(store));
    let id = ItemId::new(1);

    let first = service.fetch(id).await?;
    assert_provenance(&first, Provenance::Store);
    assert_counts(&first, 1, 0);
    assert_eq!(first.message.message(), "from store");

    let second = service.fetch(id).await?;
    assert_provenance(&second, Provenance::Cache);
    assert_counts(&second, 1, 1);

    let updated = service.update(id, ItemDraft::new("B", "first")).await?;
    assert_eq!(updated, Item::with_id(id, "B", "first"));

    let third = service.fetch(id).await?;
    assert_provenance(&third, Provenance::Store);
    assert_counts(&third, 2, 1);
    assert_eq!(third.entity, Some(Item::with_id(id, "B", "first")));

    Ok(())
}

#[tokio::test]
async fn smoke_test_scenario_with_binary_codec() -> LarderResult<()> {
    let settings = CacheSettings {
        codec: CodecKind::Binary,
        ..CacheSettings::default()
    };
    let service = service_with_settings(&settings, Arc::new(seeded_store(1)));
    let id = ItemId::new(1);

    assert_counts(&service.fetch(id).await?, 1, 0);
    let warm = service.fetch(id).await?;
    assert_counts(&warm, 1, 1);
    assert_eq!(warm.entity, Some(sample_item(1)));

    Ok(())
}

#[tokio::test]
async fn smoke_test_create_then_fetch() -> LarderResult<()> {
    let service = service_fixture(Arc::new(InMemoryEntityStore::new()));

    let created = service.create(ItemDraft::new("Widget", "A widget")).await?;
    let id = created.id.expect("created item should have an id");

    let result = service.fetch(id).await?;
    assert_provenance(&result, Provenance::Store);
    assert_eq!(result.entity, Some(created));

    Ok(())
}

#[tokio::test]
async fn smoke_test_unavailable_cache_does_not_fall_back() {
    let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
    let service = service_fixture(Arc::clone(&store));
    service.cache().backend().set_unavailable(true);

    let result = service.fetch(ItemId::new(1)).await;
    assert_cache_unavailable(&result);
    assert_eq!(store.find_calls(), 0, "store must not be consulted");
    assert_eq!(service.counters(), CounterSnapshot::default());

    service.cache().backend().set_unavailable(false);
    let result = service.fetch(ItemId::new(1)).await.expect("fetch should succeed");
    assert_provenance(&result, Provenance::Store);
}

#[tokio::test]
async fn smoke_test_unavailable_store_propagates() {
    let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
    let service = service_fixture(Arc::clone(&store));
    store.set_unavailable(true);

    assert_store_unavailable(&service.fetch(ItemId::new(1)).await);
    assert_store_unavailable(&service.update(ItemId::new(1), ItemDraft::new("B", "")).await);
    assert_eq!(service.counters(), CounterSnapshot::default());
}

#[tokio::test]
async fn smoke_test_failed_eviction_is_reported_after_save() {
    let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
    let service = service_fixture(Arc::clone(&store));
    service.cache().backend().set_unavailable(true);

    let result = service.update(ItemId::new(1), ItemDraft::new("B", "")).await;
    assert_cache_unavailable(&result);

    let stored = store.inner().ids().expect("ids should be readable");
    assert_eq!(stored, vec![ItemId::new(1)]);
    assert_eq!(store.save_calls(), 1);
}

#[tokio::test]
async fn smoke_test_undecodable_cache_entry_propagates() {
    for codec in [CodecKind::Json, CodecKind::Binary] {
        let settings = CacheSettings {
            codec,
            ..CacheSettings::default()
        };
        let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
        let service = service_with_settings(&settings, Arc::clone(&store));
        service
            .cache()
            .backend()
            .inner()
            .put(
                &RegionScopedKey::new(ITEM_REGION, "1"),
                vec![0, 0xff, 0xfe, 0x01],
                Duration::from_secs(15),
            )
            .await
            .expect("planting raw bytes should succeed");

        assert_serialization_error(&service.fetch(ItemId::new(1)).await);
        assert_eq!(store.find_calls(), 0, "store must not be consulted");
        assert_eq!(service.counters(), CounterSnapshot::default());
    }
}

#[tokio::test]
async fn smoke_test_wrong_cached_kind_is_a_serialization_error() {
    let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
    let service = service_fixture(Arc::clone(&store));
    service
        .cache()
        .put(
            ITEM_REGION,
            "1",
            &CachedValue::FetchResult(FetchResult::not_found(0, 0)),
        )
        .await
        .expect("cache put should succeed");

    assert_serialization_error(&service.fetch(ItemId::new(1)).await);
    assert_eq!(store.find_calls(), 0);
    assert_eq!(service.counters(), CounterSnapshot::default());
}

#[tokio::test]
async fn smoke_test_timeouts_propagate_unchanged() {
    let store = Arc::new(FlakyEntityStore::new(seeded_store(1)));
    let service = service_fixture(Arc::clone(&store));

    service.cache().backend().set_timed_out(true);
    assert_cache_timeout(&service.fetch(ItemId::new(1)).await, "get");
    assert_eq!(store.find_calls(), 0, "store must not be consulted");

    service.cache().backend().set_timed_out(false);
    store.set_timed_out(true);
    assert_store_timeout(&service.fetch(ItemId::new(1)).await, "find");
    assert_store_timeout(
        &service.update(ItemId::new(1), ItemDraft::new("B", "")).await,
        "save",
    );
    assert_eq!(service.counters(), CounterSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn smoke_test_entry_expires_after_region_ttl() -> LarderResult<()> {
    let service = service_fixture(Arc::new(seeded_store(1)));
    let id = ItemId::new(1);

    assert_counts(&service.fetch(id).await?, 1, 0);

    tokio::time::advance(Duration::from_secs(14)).await;
    assert_provenance(&service.fetch(id).await?, Provenance::Cache);

    tokio::time::advance(Duration::from_secs(2)).await;
    let cold = service.fetch(id).await?;
    assert_provenance(&cold, Provenance::Store);
    assert_counts(&cold, 2, 1);

    Ok(())
}

#[tokio::test]
async fn smoke_test_reset_counts_from_zero() -> LarderResult<()> {
    let service = service_fixture(Arc::new(seeded_store(2)));
    service.fetch(ItemId::new(1)).await?;
    service.fetch(ItemId::new(1)).await?;

    service.reset_counters();

    assert_counts(&service.fetch(ItemId::new(2)).await?, 1, 0);
    assert_counts(&service.fetch(ItemId::new(1)).await?, 1, 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn smoke_test_concurrent_fetches_count_every_read() {
    let service = service_fixture(Arc::new(seeded_store(5)));
    let reads_per_task = 20;
    let tasks = 16;

    let handles: Vec<_> = (0..tasks)
        .map(|t| {
            let service = service.clone();
            tokio::spawn(async move {
                for i in 0..reads_per_task {
                    let id = ItemId::new((t + i) % 5 + 1);
                    let result = service.fetch(id).await.expect("fetch should succeed");
                    assert!(result.is_found());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("fetch task should not panic");
    }

    let counters = service.counters();
    assert_eq!(
        counters.store_fetches + counters.cache_hits,
        (tasks * reads_per_task) as u64
    );
    assert!(counters.store_fetches >= 5, "every id misses at least once");
}

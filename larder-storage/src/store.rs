//! Authoritative entity store.
//!
//! The store is the source of truth that cache-aside reads fall back to. It
//! owns id assignment: an item saved without an id gets the next id from the
//! store's sequence, and an item saved with an id must already exist.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use ::async_trait::async_trait;
use larder_core::{Item, ItemId, LarderResult, StorageError};

/// Async keyed CRUD store for items.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get an item by id.
    async fn find(&self, id: ItemId) -> LarderResult<Option<Item>>;

    /// Persist an item and return the stored form.
    ///
    /// An item without an id is inserted under a fresh id. An item with an id
    /// replaces the existing row; if no such row exists the save fails with
    /// `StorageError::UpdateFailed`.
    async fn save(&self, item: Item) -> LarderResult<Item>;
}

#[async_trait]
impl<S: EntityStore + ?Sized> EntityStore for Arc<S> {
    async fn find(&self, id: ItemId) -> LarderResult<Option<Item>> {
        (**self).find(id).await
    }

    async fn save(&self, item: Item) -> LarderResult<Item> {
        (**self).save(item).await
    }
}

/// In-memory entity store.
///
/// Clones share the same rows and sequence.
#[derive(Debug, Clone)]
pub struct InMemoryEntityStore {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryEntityStore {
    /// Create an empty store whose first assigned id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with items.
    ///
    /// Items that carry an id keep it; items without one are numbered after
    /// the highest seeded id.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items: Vec<Item> = items.into_iter().collect();
        let first_free = items
            .iter()
            .filter_map(|item| item.id)
            .map(ItemId::get)
            .max()
            .map_or(1, |max| max.saturating_add(1));

        let mut rows = HashMap::with_capacity(items.len());
        let mut next = first_free;
        for item in items {
            let id = match item.id {
                Some(id) => id,
                None => {
                    let id = ItemId::new(next);
                    next = next.saturating_add(1);
                    id
                }
            };
            rows.insert(id, Item { id: Some(id), ..item });
        }

        Self {
            items: Arc::new(RwLock::new(rows)),
            next_id: Arc::new(AtomicI64::new(next)),
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> LarderResult<usize> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.len())
    }

    pub fn is_empty(&self) -> LarderResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All stored ids in ascending order.
    pub fn ids(&self) -> LarderResult<Vec<ItemId>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut ids: Vec<ItemId> = items.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn allocate_id(&self) -> LarderResult<ItemId> {
        // An exhausted sequence stays at i64::MAX.
        let raw = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|_| StorageError::InsertFailed {
                reason: "id sequence exhausted".to_string(),
            })?;
        Ok(ItemId::new(raw))
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find(&self, id: ItemId) -> LarderResult<Option<Item>> {
        let items = self.items.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(&id).cloned())
    }

    async fn save(&self, item: Item) -> LarderResult<Item> {
        match item.id {
            None => {
                let id = self.allocate_id()?;
                let stored = Item {
                    id: Some(id),
                    ..item
                };
                let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
                if items.contains_key(&id) {
                    return Err(StorageError::InsertFailed {
                        reason: format!("id {} already exists", id),
                    }
                    .into());
                }
                items.insert(id, stored.clone());
                tracing::debug!(item_id = %id, "Inserted item");
                Ok(stored)
            }
            Some(id) => {
                let mut items = self.items.write().map_err(|_| StorageError::LockPoisoned)?;
                let row = items.get_mut(&id).ok_or_else(|| StorageError::UpdateFailed {
                    id,
                    reason: "row does not exist".to_string(),
                })?;
                *row = item.clone();
                tracing::debug!(item_id = %id, "Updated item");
                Ok(item)
            }
        }
    }
}

//! Read results carrying provenance and counter values.

use crate::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a fetched item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Provenance {
    /// Served from the cache region.
    #[serde(rename = "from cache")]
    Cache,
    /// Loaded from the entity store (and written back to the cache).
    #[serde(rename = "from store")]
    Store,
    /// Neither the cache nor the store had the item.
    #[serde(rename = "not found")]
    NotFound,
}

impl Provenance {
    /// Boundary message for this provenance.
    pub fn message(self) -> &'static str {
        match self {
            Self::Cache => "from cache",
            Self::Store => "from store",
            Self::NotFound => "not found",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a counted fetch.
///
/// Built per request and never persisted by the service. The counter fields
/// are cumulative process-wide values observed while serving this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FetchResult {
    pub entity: Option<Item>,
    pub store_fetch_count: u64,
    pub cache_hit_count: u64,
    pub message: Provenance,
}

impl FetchResult {
    pub fn from_cache(item: Item, store_fetch_count: u64, cache_hit_count: u64) -> Self {
        Self {
            entity: Some(item),
            store_fetch_count,
            cache_hit_count,
            message: Provenance::Cache,
        }
    }

    pub fn from_store(item: Item, store_fetch_count: u64, cache_hit_count: u64) -> Self {
        Self {
            entity: Some(item),
            store_fetch_count,
            cache_hit_count,
            message: Provenance::Store,
        }
    }

    pub fn not_found(store_fetch_count: u64, cache_hit_count: u64) -> Self {
        Self {
            entity: None,
            store_fetch_count,
            cache_hit_count,
            message: Provenance::NotFound,
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.message
    }

    pub fn was_cache_hit(&self) -> bool {
        self.message == Provenance::Cache
    }

    pub fn is_found(&self) -> bool {
        self.entity.is_some()
    }

    /// Consume the result, returning the item if one was found.
    pub fn into_entity(self) -> Option<Item> {
        self.entity
    }
}

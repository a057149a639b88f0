//! Cache layer with named regions and per-entry expiry.
//!
//! This module provides the cache side of cache-aside reads: a byte-level
//! [`CacheBackend`] that enforces TTLs, and a [`CacheStore`] that layers
//! regions and codecs on top of it.
//!
//! # Regions
//!
//! A [`CacheRegion`] binds a name to a TTL and a codec. Backend keys are
//! [`RegionScopedKey`]s encoded as `"{region}::{key}"`, so the same logical
//! key in two regions never collides and a whole region can be dropped at
//! once.
//!
//! # Backends
//!
//! - [`MemoryCacheBackend`]: shared in-process map, lazy expiry on read plus
//!   an optional background sweeper.
//! - [`LmdbCacheBackend`]: memory-mapped LMDB database that outlives the
//!   process; expiry is stamped into each stored value.
//!
//! # Example
//!
//! ```ignore
//! let store = CacheStore::new(
//!     Arc::new(MemoryCacheBackend::new()),
//!     RegionRegistry::from_config(&config.cache),
//! );
//!
//! store.put_item("itemCache", "1", &item).await?;
//! let cached = store.get_item("itemCache", "1").await?;
//! ```

pub mod lmdb_backend;
pub mod memory_backend;
pub mod region;
pub mod region_key;
pub mod store;
pub mod traits;

pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::MemoryCacheBackend;
pub use region::{CacheRegion, RegionRegistry};
pub use region_key::RegionScopedKey;
pub use store::CacheStore;
pub use traits::{CacheBackend, CacheStats};

use std::sync::Arc;

use larder_core::{BackendKind, CacheSettings, LarderResult};

/// Open the backend selected by configuration.
pub fn open_backend(settings: &CacheSettings) -> LarderResult<Arc<dyn CacheBackend>> {
    match settings.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryCacheBackend::new())),
        BackendKind::Lmdb => {
            let backend = LmdbCacheBackend::new(&settings.lmdb_path, settings.lmdb_max_size_mb)?;
            Ok(Arc::new(backend))
        }
    }
}

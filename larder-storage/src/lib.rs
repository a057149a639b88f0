//! LARDER Storage - Cache Backends, Codecs and Entity Store
//!
//! Defines the two stores that cache-aside reads coordinate:
//! - the cache side ([`cache`]): TTL-enforcing backends, named regions and
//!   the region-aware [`CacheStore`]
//! - the authoritative side ([`store`]): the [`EntityStore`] trait and an
//!   in-memory implementation
//!
//! Values cross the cache transport through a [`codec::Codec`].

pub mod cache;
pub mod codec;
pub mod store;

// Re-export cache types for service integration
pub use cache::{
    open_backend, CacheBackend, CacheRegion, CacheStats, CacheStore, LmdbCacheBackend,
    LmdbCacheError, MemoryCacheBackend, RegionRegistry, RegionScopedKey,
};
pub use codec::{codec_for, BinaryCodec, CachedValue, Codec, JsonCodec, TypeRegistry, ValueKind};
pub use store::{EntityStore, InMemoryEntityStore};

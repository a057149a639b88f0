//! Named cache regions.
//!
//! A region binds a logical namespace to one TTL and one codec. Every entry
//! written through a region shares both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use larder_core::{CacheError, CacheSettings, LarderResult, DEFAULT_REGION};

use crate::codec::{codec_for, Codec};

/// A configured cache region.
#[derive(Debug, Clone)]
pub struct CacheRegion {
    name: String,
    ttl: Duration,
    codec: Arc<dyn Codec>,
}

impl CacheRegion {
    pub fn new(name: impl Into<String>, ttl: Duration, codec: Arc<dyn Codec>) -> Self {
        Self {
            name: name.into(),
            ttl,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }
}

/// Lookup table of configured regions.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: HashMap<String, CacheRegion>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the item region and the catch-all `defaultCache` region from settings.
    ///
    /// Both regions share the configured codec. If the item region is itself
    /// named `defaultCache` the item TTL wins.
    pub fn from_config(settings: &CacheSettings) -> Self {
        let codec = codec_for(settings.codec);
        let mut registry = Self::new();
        registry.register(CacheRegion::new(
            DEFAULT_REGION,
            settings.default_ttl,
            Arc::clone(&codec),
        ));
        registry.register(CacheRegion::new(
            settings.item_region.clone(),
            settings.item_ttl,
            codec,
        ));
        registry
    }

    /// Register a region, replacing any previous region with the same name.
    pub fn register(&mut self, region: CacheRegion) -> &mut Self {
        tracing::debug!(
            region = %region.name,
            ttl_secs = region.ttl.as_secs_f64(),
            codec = region.codec.name(),
            "Registered cache region"
        );
        self.regions.insert(region.name.clone(), region);
        self
    }

    /// Resolve a region by name.
    pub fn region(&self, name: &str) -> LarderResult<&CacheRegion> {
        self.regions.get(name).ok_or_else(|| {
            CacheError::RegionUnconfigured {
                region: name.to_string(),
            }
            .into()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }
}

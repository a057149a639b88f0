//! Configuration types
//!
//! Configuration is loaded from environment variables with defaults that
//! match the reference deployment (a 15 second item region).

use crate::{ConfigError, LarderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Name of the item region in the reference deployment.
pub const ITEM_REGION: &str = "itemCache";

/// Name of the catch-all region.
pub const DEFAULT_REGION: &str = "defaultCache";

/// Value encoding used on the cache transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Compact binary payload; value kinds must be registered up front.
    Binary,
    /// Self-describing JSON with a type discriminator.
    #[default]
    Json,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "bincode" => Ok(Self::Binary),
            "json" | "text" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "codec".to_string(),
                value: other.to_string(),
                reason: "expected one of: binary, json".to_string(),
            }),
        }
    }
}

/// Which cache backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Lmdb,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "lmdb" => Ok(Self::Lmdb),
            other => Err(ConfigError::InvalidValue {
                field: "backend".to_string(),
                value: other.to_string(),
                reason: "expected one of: memory, lmdb".to_string(),
            }),
        }
    }
}

/// Cache region and backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Region that holds items.
    pub item_region: String,
    /// TTL for entries in the item region.
    pub item_ttl: Duration,
    /// TTL for the catch-all region.
    ///
    /// Always finite: every backend entry carries an expiry, so a region
    /// that never expires is not expressible. The default is ten minutes.
    pub default_ttl: Duration,
    /// Codec shared by all configured regions.
    pub codec: CodecKind,
    pub backend: BackendKind,
    /// Directory for the LMDB environment (lmdb backend only).
    pub lmdb_path: PathBuf,
    pub lmdb_max_size_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            item_region: ITEM_REGION.to_string(),
            item_ttl: Duration::from_secs(15),
            default_ttl: Duration::from_secs(600),
            codec: CodecKind::Json,
            backend: BackendKind::Memory,
            lmdb_path: PathBuf::from("./larder-cache"),
            lmdb_max_size_mb: 64,
        }
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LarderConfig {
    pub cache: CacheSettings,
}

impl LarderConfig {
    /// Create LarderConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LARDER_ITEM_REGION`: Item region name (default: itemCache)
    /// - `LARDER_ITEM_TTL_SECS`: Item entry TTL (default: 15)
    /// - `LARDER_DEFAULT_TTL_SECS`: Catch-all region TTL (default: 600)
    /// - `LARDER_CACHE_CODEC`: "json" or "binary" (default: json)
    /// - `LARDER_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `LARDER_LMDB_PATH`: LMDB directory (default: ./larder-cache)
    /// - `LARDER_LMDB_MAX_SIZE_MB`: LMDB map size (default: 64)
    ///
    /// Unparseable numbers fall back to the default; unknown codec or backend
    /// names are an error.
    pub fn from_env() -> LarderResult<Self> {
        let defaults = CacheSettings::default();

        let item_region = std::env::var("LARDER_ITEM_REGION")
            .ok()
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.item_region);

        let item_ttl = std::env::var("LARDER_ITEM_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.item_ttl);

        let default_ttl = std::env::var("LARDER_DEFAULT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_ttl);

        let codec = match std::env::var("LARDER_CACHE_CODEC") {
            Ok(s) => s.parse()?,
            Err(_) => defaults.codec,
        };

        let backend = match std::env::var("LARDER_CACHE_BACKEND") {
            Ok(s) => s.parse()?,
            Err(_) => defaults.backend,
        };

        let lmdb_path = std::env::var("LARDER_LMDB_PATH")
            .ok()
            .map(PathBuf::from)
            .unwrap_or(defaults.lmdb_path);

        let lmdb_max_size_mb = std::env::var("LARDER_LMDB_MAX_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lmdb_max_size_mb);

        let config = Self {
            cache: CacheSettings {
                item_region,
                item_ttl,
                default_ttl,
                codec,
                backend,
                lmdb_path,
                lmdb_max_size_mb,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the item region name.
    pub fn with_item_region(mut self, name: impl Into<String>) -> Self {
        self.cache.item_region = name.into();
        self
    }

    /// Set the item region TTL.
    pub fn with_item_ttl(mut self, ttl: Duration) -> Self {
        self.cache.item_ttl = ttl;
        self
    }

    /// Set the codec.
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.cache.codec = codec;
        self
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.cache.backend = backend;
        self
    }

    /// Set the LMDB directory.
    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache.lmdb_path = path.into();
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - region name is not empty and has no `::` separator
    /// - both TTLs are non-zero
    /// - LMDB map size is non-zero
    pub fn validate(&self) -> LarderResult<()> {
        let cache = &self.cache;

        if cache.item_region.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "item_region".to_string(),
            }
            .into());
        }

        if cache.item_region.contains("::") {
            return Err(ConfigError::InvalidValue {
                field: "item_region".to_string(),
                value: cache.item_region.clone(),
                reason: "region names must not contain '::'".to_string(),
            }
            .into());
        }

        if cache.item_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "item_ttl".to_string(),
                value: "0".to_string(),
                reason: "TTL must be positive".to_string(),
            }
            .into());
        }

        if cache.default_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "default_ttl".to_string(),
                value: "0".to_string(),
                reason: "TTL must be positive".to_string(),
            }
            .into());
        }

        if cache.lmdb_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "map size must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LarderError;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = LarderConfig::default();
        assert_eq!(config.cache.item_region, ITEM_REGION);
        assert_eq!(config.cache.item_ttl, Duration::from_secs(15));
        assert_eq!(config.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(config.cache.codec, CodecKind::Json);
        assert_eq!(config.cache.backend, BackendKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_codec_kind_parse() {
        assert_eq!("binary".parse::<CodecKind>().unwrap(), CodecKind::Binary);
        assert_eq!("BINCODE".parse::<CodecKind>().unwrap(), CodecKind::Binary);
        assert_eq!(" json ".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert_eq!("text".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert!("kryo".parse::<CodecKind>().is_err());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("lmdb".parse::<BackendKind>().unwrap(), BackendKind::Lmdb);
        assert_eq!("Memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = LarderConfig::default().with_item_ttl(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            LarderError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "item_ttl"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_region() {
        let config = LarderConfig::default().with_item_region("");
        assert!(matches!(
            config.validate(),
            Err(LarderError::Config(ConfigError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_separator_in_region() {
        let config = LarderConfig::default().with_item_region("item::cache");
        assert!(matches!(
            config.validate(),
            Err(LarderError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_builder_setters() {
        let config = LarderConfig::default()
            .with_item_region("items")
            .with_item_ttl(Duration::from_secs(30))
            .with_codec(CodecKind::Binary)
            .with_backend(BackendKind::Lmdb)
            .with_lmdb_path("/tmp/larder");

        assert_eq!(config.cache.item_region, "items");
        assert_eq!(config.cache.item_ttl, Duration::from_secs(30));
        assert_eq!(config.cache.codec, CodecKind::Binary);
        assert_eq!(config.cache.backend, BackendKind::Lmdb);
        assert_eq!(config.cache.lmdb_path, PathBuf::from("/tmp/larder"));
    }
}

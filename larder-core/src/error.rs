//! Error types for LARDER operations

use crate::ItemId;
use std::time::Duration;
use thiserror::Error;

/// Authoritative store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Entity store timed out during {operation} after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    #[error("Update failed for item {id}: {reason}")]
    UpdateFailed { id: ItemId, reason: String },

    #[error("Insert failed: {reason}")]
    InsertFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache backend and region errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The region was never registered. Configuration bug, not transient.
    #[error("Cache region not configured: {region}")]
    RegionUnconfigured { region: String },

    #[error("Cache backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Cache backend {backend} timed out during {operation} after {elapsed:?}")]
    Timeout {
        backend: String,
        operation: String,
        elapsed: Duration,
    },
}

/// Cache value encoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("{codec} encoding failed: {reason}")]
    Encode { codec: String, reason: String },

    #[error("{codec} decoding failed: {reason}")]
    Decode { codec: String, reason: String },

    #[error("{codec} has no registration for value kind {kind}")]
    Unregistered { codec: String, kind: String },

    #[error("{codec} rejected value kind {kind}: not in the allow-list")]
    Rejected { codec: String, kind: String },

    #[error("Expected cached {expected}, found {found}")]
    UnexpectedKind { expected: String, found: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Initialization failed for {component}: {reason}")]
    InitFailed { component: String, reason: String },
}

/// Master error type for all LARDER errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LarderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LarderError {
    /// Backend reachability failures an outer layer may retry.
    ///
    /// Nothing in this workspace retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::Unavailable { .. })
                | Self::Storage(StorageError::Timeout { .. })
                | Self::Cache(CacheError::Unavailable { .. })
                | Self::Cache(CacheError::Timeout { .. })
        )
    }

    /// True for `CacheError::RegionUnconfigured`.
    pub fn is_region_unconfigured(&self) -> bool {
        matches!(self, Self::Cache(CacheError::RegionUnconfigured { .. }))
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Codec(_))
    }
}

/// Result type alias for LARDER operations.
pub type LarderResult<T> = Result<T, LarderError>;

// =============================================================================
// TESTS
// =============================================================================

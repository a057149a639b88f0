//! LMDB-backed cache implementation with per-entry expiry.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store that survives process restarts and can be shared by
//! several processes on one host.
//!
//! # Value Format
//!
//! Every stored value is `[expires_at: 8 bytes, i64 LE unix millis][payload]`.
//! Expiry is checked on read; an expired entry is deleted by the read that
//! finds it.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get`
//! - Write transactions for `put`, `evict`, `invalidate_region` and lazy expiry
//! - Statistics are tracked behind a lock

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use larder_core::{CacheError, CodecError, LarderError, LarderResult};

use super::region_key::RegionScopedKey;
use super::traits::{CacheBackend, CacheStats};

const BACKEND_NAME: &str = "lmdb";
const HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored value is too short to carry an expiry header.
    #[error("Corrupt entry for key {0}")]
    CorruptEntry(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An unusable LMDB environment means the cache is unavailable. A corrupt
/// entry is undecodable cached data and is never retried.
impl From<LmdbCacheError> for LarderError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::CorruptEntry(_) => LarderError::Codec(CodecError::Decode {
                codec: BACKEND_NAME.to_string(),
                reason: e.to_string(),
            }),
            _ => LarderError::Cache(CacheError::Unavailable {
                backend: BACKEND_NAME.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// LMDB-backed cache.
///
/// # Example
///
/// ```ignore
/// use larder_storage::cache::{LmdbCacheBackend, RegionScopedKey};
///
/// let backend = LmdbCacheBackend::new("/tmp/larder-cache", 64)?;
/// let key = RegionScopedKey::new("itemCache", "1");
///
/// backend.put(&key, bytes, Duration::from_secs(15)).await?;
/// let cached = backend.get(&key).await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Global statistics.
    stats: RwLock<CacheStats>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this backend and is
        // not opened twice within this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        tracing::info!(path = %path.as_ref().display(), max_size_mb, "Opened LMDB cache");

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self, expired: bool) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
            if expired {
                stats.expirations += 1;
                stats.entry_count = stats.entry_count.saturating_sub(1);
            }
        }
    }

    fn record_removed(&self, count: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = stats.entry_count.saturating_sub(count);
        }
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Split a stored value into its expiry and payload.
    fn split_entry<'a>(key: &str, bytes: &'a [u8]) -> Result<(i64, &'a [u8]), LmdbCacheError> {
        if bytes.len() < HEADER_LEN {
            return Err(LmdbCacheError::CorruptEntry(key.to_string()));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        let expires_at: [u8; HEADER_LEN] = header
            .try_into()
            .map_err(|_| LmdbCacheError::CorruptEntry(key.to_string()))?;
        Ok((i64::from_le_bytes(expires_at), payload))
    }

    /// Delete `key` only if it is still expired at `now`.
    fn delete_if_expired(&self, key: &str, now: i64) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let still_expired = match self
            .db
            .get(&wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
        {
            Some(bytes) => Self::split_entry(key, bytes)
                .map(|(expires_at, _)| expires_at <= now)
                .unwrap_or(true),
            None => false,
        };

        let deleted = if still_expired {
            self.db
                .delete(&mut wtxn, key.as_bytes())
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
        } else {
            false
        };

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(deleted)
    }

    /// Iterate over keys matching a prefix and collect them.
    fn collect_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        for result in iter {
            match result {
                Ok((key, _)) => {
                    if key.starts_with(prefix) {
                        keys.push(key.to_vec());
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn get(&self, key: &RegionScopedKey) -> LarderResult<Option<Vec<u8>>> {
        let encoded = key.encode();
        let now = Self::now_millis();

        let lookup = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

            match self
                .db
                .get(&rtxn, encoded.as_bytes())
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
            {
                Some(bytes) => {
                    let (expires_at, payload) = Self::split_entry(&encoded, bytes)?;
                    Some((expires_at, payload.to_vec()))
                }
                None => None,
            }
        };

        match lookup {
            Some((expires_at, payload)) if now < expires_at => {
                self.record_hit();
                Ok(Some(payload))
            }
            Some(_) => {
                let deleted = self.delete_if_expired(&encoded, now)?;
                self.record_miss(deleted);
                Ok(None)
            }
            None => {
                self.record_miss(false);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &RegionScopedKey, bytes: Vec<u8>, ttl: Duration) -> LarderResult<()> {
        let encoded = key.encode();
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Self::now_millis().saturating_add(ttl_millis);

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + bytes.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(&bytes);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let is_new = self
            .db
            .get(&wtxn, encoded.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
            .is_none();

        self.db
            .put(&mut wtxn, encoded.as_bytes(), &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        if is_new {
            if let Ok(mut stats) = self.stats.write() {
                stats.entry_count += 1;
            }
        }

        Ok(())
    }

    async fn evict(&self, key: &RegionScopedKey) -> LarderResult<()> {
        let encoded = key.encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, encoded.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        if deleted {
            self.record_removed(1);
        }

        Ok(())
    }

    async fn invalidate_region(&self, region: &str) -> LarderResult<u64> {
        let prefix = RegionScopedKey::region_prefix(region);
        let keys_to_delete = self.collect_keys_with_prefix(prefix.as_bytes())?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut deleted = 0u64;
        for key in &keys_to_delete {
            if self.db.delete(&mut wtxn, key).unwrap_or(false) {
                deleted += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.record_removed(deleted);
        Ok(deleted)
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        Ok(self.stats.read().map(|s| s.clone()).unwrap_or_default())
    }
}

//! Value store contract and the in-memory backend.
//!
//! The store holds one [`CacheEntry`] per [`CacheKey`] with a per-entry expiry. Writes are
//! last-write-wins overwrites; expiry is timed eviction, never an explicit tombstone.

use crate::{
    cache::types::{CacheEntry, CacheKey},
    utils::clock::{to_time_delta, Clock},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::{future::Cache, Expiry};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::trace;

/// Errors raised by a [`ValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend cannot be reached. Reads treat this as a miss, writes log it.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry, shared by all keys and callers.
///
/// Implementations must be safe for concurrent readers and writers without external locking.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Stores `entry`, replacing any prior entry for `key`, expiring after `ttl`.
    async fn put(&self, key: &CacheKey, entry: CacheEntry, ttl: Duration)
        -> Result<(), StoreError>;

    /// Returns the live entry for `key`, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Checks backend reachability.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    entry: CacheEntry,
    ttl: Duration,
    expires_at: DateTime<Utc>,
}

/// Per-record expiry: every insert (including overwrites) restarts the record's own TTL.
struct RecordExpiry;

impl Expiry<CacheKey, StoredRecord> for RecordExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &StoredRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &StoredRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Configuration for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum number of entries before size-based eviction kicks in.
    pub max_entries: u64,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self { max_entries: 100_000 }
    }
}

/// In-process [`ValueStore`] backed by a `moka` cache.
///
/// Moka evicts records on its own monotonic timer; reads additionally compare the record's
/// wall-clock deadline with the injected [`Clock`] so expiry follows the same time source as
/// freshness.
pub struct MemoryStore {
    entries: Cache<CacheKey, StoredRecord>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(config: &MemoryStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let entries =
            Cache::builder().max_capacity(config.max_entries).expire_after(RecordExpiry).build();
        Self { entries, clock }
    }

    /// Number of entries currently held, including ones pending eviction.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl ValueStore for MemoryStore {
    async fn put(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(to_time_delta(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.entries.insert(key.clone(), StoredRecord { entry, ttl, expires_at }).await;
        trace!(key = %key, ttl_secs = ttl.as_secs(), "store put");
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let Some(record) = self.entries.get(key).await else {
            return Ok(None);
        };

        // Left for moka to evict: a concurrent put may already have replaced the record.
        if record.expires_at <= self.clock.now() {
            trace!(key = %key, "store entry expired");
            return Ok(None);
        }

        Ok(Some(record.entry))
    }
}

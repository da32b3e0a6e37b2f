//! Refresh executor.
//!
//! One refresh is one batched round trip. On success the snapshot is written to the store
//! with `stale_ttl` expiry. On failure the executor serves the last stored value; only when
//! nothing is stored does the call fail.

pub mod snapshot;

pub use snapshot::{snapshot_batch, ContractSnapshot};

use crate::{
    cache::{CacheEntry, CacheKey, ValueStore},
    metrics::{self, RefreshOutcomeLabel},
    upstream::{BatchTransport, Endpoint, UpstreamError},
    utils::clock::Clock,
};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    /// Upstream failed and no stored value exists for the key.
    #[error("refresh failed for {key}: {source}")]
    Failed {
        key: String,
        #[source]
        source: UpstreamError,
    },
}

/// Result of a refresh that produced a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refreshed {
    pub snapshot: ContractSnapshot,
    pub fetched_at: DateTime<Utc>,
    /// `true` when the upstream failed and the last stored value was served.
    pub fallback: bool,
}

pub struct RefreshExecutor {
    transport: Arc<dyn BatchTransport>,
    store: Arc<dyn ValueStore>,
    clock: Arc<dyn Clock>,
    stale_ttl: Duration,
}

impl RefreshExecutor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        store: Arc<dyn ValueStore>,
        clock: Arc<dyn Clock>,
        stale_ttl: Duration,
    ) -> Self {
        Self { transport, store, clock, stale_ttl }
    }

    /// Refreshes `key` against `endpoint`, falling back to the stored value on failure.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Failed`] if the upstream fails and nothing is stored.
    pub async fn refresh(
        &self,
        key: &CacheKey,
        endpoint: &Endpoint,
    ) -> Result<Refreshed, RefreshError> {
        match self.fetch_live(key, endpoint).await {
            Ok(refreshed) => {
                metrics::record_refresh(RefreshOutcomeLabel::Success);
                Ok(refreshed)
            }
            Err(e) => {
                warn!(key = %key, error = %e, transient = e.is_transient(), "live refresh failed");

                if let Some((snapshot, fetched_at)) = self.load_stored(key).await {
                    info!(key = %key, "serving last stored value after failed refresh");
                    metrics::record_refresh(RefreshOutcomeLabel::Fallback);
                    return Ok(Refreshed { snapshot, fetched_at, fallback: true });
                }

                metrics::record_refresh(RefreshOutcomeLabel::Failed);
                Err(RefreshError::Failed { key: key.to_string(), source: e })
            }
        }
    }

    async fn fetch_live(
        &self,
        key: &CacheKey,
        endpoint: &Endpoint,
    ) -> Result<Refreshed, UpstreamError> {
        let batch = snapshot_batch(key.subject());
        let response = self.transport.send(endpoint, &batch).await?;

        let snapshot = ContractSnapshot::from_batch(&endpoint.name, &response);
        let fetched_at = self.clock.now();

        self.write(key, &snapshot, fetched_at).await;
        debug!(key = %key, block_number = snapshot.block_number, "snapshot refreshed");

        Ok(Refreshed { snapshot, fetched_at, fallback: false })
    }

    /// Best-effort store write. The caller already has the value, so failures are only logged.
    async fn write(&self, key: &CacheKey, snapshot: &ContractSnapshot, fetched_at: DateTime<Utc>) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode snapshot");
                return;
            }
        };

        if let Err(e) = self.store.put(key, CacheEntry::new(payload, fetched_at), self.stale_ttl).await
        {
            warn!(key = %key, error = %e, "store write failed");
        }
    }

    async fn load_stored(&self, key: &CacheKey) -> Option<(ContractSnapshot, DateTime<Utc>)> {
        match self.store.get(key).await {
            Ok(Some(entry)) => {
                ContractSnapshot::from_entry(&entry).map(|snapshot| (snapshot, entry.fetched_at))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed during fallback");
                None
            }
        }
    }
}

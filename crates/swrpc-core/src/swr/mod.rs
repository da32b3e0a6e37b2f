//! Stale-while-revalidate policy.
//!
//! Evaluated per lookup, in order:
//!
//! 1. Read the entry and derive its freshness from `fetched_at`.
//! 2. `Fresh` → return the stored value, no upstream access.
//! 3. `Stale` → return the stored value and hand the key to the [`BackgroundRefresher`].
//! 4. `Miss` → refresh inline and return that result (or its fallback / failure).
//!
//! A store read error and an undecodable payload are both treated as `Miss`.

pub mod background;

pub use background::BackgroundRefresher;

use crate::{
    cache::{CacheKey, Freshness, FreshnessPolicy, ValueStore},
    metrics,
    refresh::{ContractSnapshot, RefreshError, RefreshExecutor},
    types::CacheStatus,
    upstream::Endpoint,
    utils::clock::Clock,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// A served value and how it was served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub key: CacheKey,
    pub snapshot: ContractSnapshot,
    pub status: CacheStatus,
    pub fetched_at: DateTime<Utc>,
}

pub struct SwrCache {
    store: Arc<dyn ValueStore>,
    executor: Arc<RefreshExecutor>,
    refresher: Arc<BackgroundRefresher>,
    clock: Arc<dyn Clock>,
    policy: FreshnessPolicy,
}

impl SwrCache {
    #[must_use]
    pub fn new(
        store: Arc<dyn ValueStore>,
        executor: Arc<RefreshExecutor>,
        refresher: Arc<BackgroundRefresher>,
        clock: Arc<dyn Clock>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self { store, executor, refresher, clock, policy }
    }

    #[must_use]
    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Serves `key` according to the freshness policy.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] only on a miss whose inline refresh failed with nothing
    /// stored to fall back on.
    pub async fn get(&self, key: &CacheKey, endpoint: &Endpoint) -> Result<Lookup, RefreshError> {
        let stored = self.read(key).await;
        let now = self.clock.now();

        let freshness = stored
            .as_ref()
            .map_or(Freshness::Miss, |(_, fetched_at)| self.policy.classify_at(*fetched_at, now));

        let lookup = match (freshness, stored) {
            (Freshness::Fresh, Some((snapshot, fetched_at))) => {
                Lookup { key: key.clone(), snapshot, status: CacheStatus::Fresh, fetched_at }
            }
            (Freshness::Stale, Some((snapshot, fetched_at))) => {
                self.refresher.spawn(key.clone(), endpoint.clone());
                Lookup { key: key.clone(), snapshot, status: CacheStatus::Stale, fetched_at }
            }
            _ => {
                let refreshed = self
                    .executor
                    .refresh(key, endpoint)
                    .await
                    .inspect_err(|_| metrics::record_lookup_failure())?;
                let status =
                    if refreshed.fallback { CacheStatus::Fallback } else { CacheStatus::Miss };
                Lookup {
                    key: key.clone(),
                    snapshot: refreshed.snapshot,
                    status,
                    fetched_at: refreshed.fetched_at,
                }
            }
        };

        debug!(key = %key, status = lookup.status.as_str(), "lookup served");
        metrics::record_lookup(lookup.status);
        Ok(lookup)
    }

    async fn read(&self, key: &CacheKey) -> Option<(ContractSnapshot, DateTime<Utc>)> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed, treating as miss");
                return None;
            }
        };

        match ContractSnapshot::from_entry(&entry) {
            Some(snapshot) => Some((snapshot, entry.fetched_at)),
            None => {
                warn!(key = %key, "stored payload could not be decoded, treating as miss");
                None
            }
        }
    }
}

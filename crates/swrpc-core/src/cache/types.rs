//! Cache key, entry and freshness types.

use chrono::{DateTime, Utc};
use std::{fmt, sync::Arc, time::Duration};

/// Keyspace a [`CacheKey`] belongs to.
///
/// Snapshot values and ingested event logs share one store but never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Snapshot,
    Logs,
}

impl Namespace {
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Snapshot => "web3",
            Self::Logs => "logs",
        }
    }
}

/// Composite cache key: source identifier plus normalized subject.
///
/// Keys must only be built from normalized subjects (see
/// [`KeyNormalizer`](crate::normalize::KeyNormalizer)); equality is exact string equality.
/// Cloning is cheap, both parts are reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    source: Arc<str>,
    subject: Arc<str>,
}

impl CacheKey {
    #[must_use]
    pub fn new(source: impl Into<Arc<str>>, subject: impl Into<Arc<str>>) -> Self {
        Self { namespace: Namespace::Snapshot, source: source.into(), subject: subject.into() }
    }

    /// Returns the same source and subject under another namespace.
    #[must_use]
    pub fn in_namespace(&self, namespace: Namespace) -> Self {
        Self { namespace, source: Arc::clone(&self.source), subject: Arc::clone(&self.subject) }
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace.prefix(), self.source, self.subject)
    }
}

/// A stored value together with the time it was fetched.
///
/// Stored as one atomic record, so a reader can never observe a payload without its timestamp.
/// The payload is the serialized JSON of the cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub payload: Arc<str>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(payload: impl Into<Arc<str>>, fetched_at: DateTime<Utc>) -> Self {
        Self { payload: payload.into(), fetched_at }
    }

    /// Age of the entry at `now`. Entries stamped in the future have zero age.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        age_between(self.fetched_at, now)
    }
}

/// Freshness of a lookup, derived from the entry age and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Miss,
}

/// The two time windows that drive freshness.
///
/// `fresh_ttl` bounds how long a value is served without refresh; `stale_ttl` is the store
/// expiry, after which the entry is gone and the state becomes [`Freshness::Miss`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub fresh_ttl: Duration,
    pub stale_ttl: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self { fresh_ttl: Duration::from_secs(10), stale_ttl: Duration::from_secs(120) }
    }
}

impl FreshnessPolicy {
    #[must_use]
    pub fn new(fresh_ttl: Duration, stale_ttl: Duration) -> Self {
        Self { fresh_ttl, stale_ttl }
    }

    /// Classifies an entry age.
    ///
    /// - `age <= fresh_ttl` → [`Freshness::Fresh`]
    /// - `fresh_ttl < age <= stale_ttl` → [`Freshness::Stale`]
    /// - older → [`Freshness::Miss`] (the store should already have evicted it)
    #[must_use]
    pub fn classify(&self, age: Duration) -> Freshness {
        if age <= self.fresh_ttl {
            Freshness::Fresh
        } else if age <= self.stale_ttl {
            Freshness::Stale
        } else {
            Freshness::Miss
        }
    }

    /// Classifies a value fetched at `fetched_at`, observed at `now`.
    #[must_use]
    pub fn classify_at(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
        self.classify(age_between(fetched_at, now))
    }

    /// Classifies an optional entry at `now`.
    #[must_use]
    pub fn classify_entry(&self, entry: Option<&CacheEntry>, now: DateTime<Utc>) -> Freshness {
        entry.map_or(Freshness::Miss, |entry| self.classify(entry.age_at(now)))
    }
}

fn age_between(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(fetched_at).to_std().unwrap_or(Duration::ZERO)
}

//! Value store and freshness model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ValueStore                    │
//! │  put(key, entry, ttl) / get(key) / ping()     │
//! └──────────────────────────────────────────────┘
//!                      │
//!              ┌───────▼───────┐
//!              │  MemoryStore  │
//!              │ • moka cache  │
//!              │ • per-entry   │
//!              │   expiry      │
//!              └───────────────┘
//! ```
//!
//! An entry is one atomic record of serialized payload plus `fetched_at`, so the two always
//! expire together. [`FreshnessPolicy`] derives `Fresh`/`Stale`/`Miss` from the entry age; the
//! state itself is never stored.
//!
//! Writes use `stale_ttl` as the expiry window: once it elapses the store evicts the entry and
//! the next lookup is a miss.

pub mod store;
pub mod types;

pub use store::{MemoryStore, MemoryStoreConfig, StoreError, ValueStore};
pub use types::{CacheEntry, CacheKey, Freshness, FreshnessPolicy, Namespace};

//! # swrpc Core
//!
//! Stale-while-revalidate cache in front of rate-limited JSON-RPC nodes. A lookup for a
//! contract on a chain is answered from the cache whenever possible and refreshed with a
//! single batched round trip otherwise.
//!
//! - **[`cache`]**: Value store with per-entry expiry and freshness classification.
//! - **[`upstream`]**: Source registry, HTTP client and the batched JSON-RPC transport.
//! - **[`refresh`]**: Builds the snapshot batch, decodes bad entries to zero and falls back to the
//!   last stored value when the upstream fails.
//! - **[`swr`]**: The serve-fresh / serve-stale-and-refresh / fetch-and-wait policy.
//! - **[`lookup`]**: Public entry point combining normalization, the SWR policy and the
//!   resolved-value notification.
//! - **[`persistence`]** and **[`ingest`]**: Consumers of resolved values, decoupled from the
//!   lookup path.
//! - **[`runtime`]**: Explicitly constructed context owning all of the above.
//!
//! ## Request Flow
//!
//! ```text
//! LookupService::get(raw, source)
//!       │
//!       ▼
//! ┌──────────────┐  unknown   ┌───────────────────┐
//! │ SourceRegistry│ ─────────► │ UnsupportedSource │
//! └──────┬───────┘            └───────────────────┘
//!        ▼
//! ┌──────────────┐  malformed ┌───────────────────┐
//! │ KeyNormalizer│ ─────────► │  InvalidSubject   │
//! └──────┬───────┘            └───────────────────┘
//!        ▼
//! ┌──────────────┐
//! │   SwrCache   │── Fresh ──► value
//! │              │── Stale ──► value + BackgroundRefresher::spawn
//! │              │── Miss ───► RefreshExecutor::refresh (inline)
//! └──────┬───────┘
//!        ▼
//! ResolvedNotifier::notify ──► PersistenceWorker ──► sinks
//! ```

pub mod cache;
pub mod config;
pub mod ingest;
pub mod lookup;
pub mod metrics;
pub mod normalize;
pub mod persistence;
pub mod refresh;
pub mod runtime;
pub mod swr;
pub mod types;
pub mod upstream;
pub mod utils;

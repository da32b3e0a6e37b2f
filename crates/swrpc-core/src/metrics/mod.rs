//! # Metrics
//!
//! Thin recording helpers over the `metrics` facade. Recording is lock-free and a no-op until
//! a recorder is installed, so library code records unconditionally and the binary decides
//! whether to export.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `swr_lookups_total` | counter | `status` (`FRESH`, `STALE`, `MISS`, `FALLBACK`, `error`) |
//! | `swr_refresh_total` | counter | `outcome` |
//! | `swr_background_refresh_skipped_total` | counter | |
//! | `swr_upstream_batch_duration_seconds` | histogram | `source` |
//! | `swr_upstream_errors_total` | counter | `source`, `kind` |
//! | `swr_rpc_entry_errors_total` | counter | `source`, `category` |
//! | `swr_persist_failures_total` | counter | `sink` |
//!
//! ## String Interning
//!
//! Source names come from configuration and are interned on first use. The set is bounded by
//! the configured sources.

use crate::{types::CacheStatus, upstream::errors::RpcErrorCategory};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{borrow::Cow, sync::OnceLock, time::Duration};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static SOURCE_NAME_POOL: OnceLock<dashmap::DashMap<String, &'static str>> = OnceLock::new();

#[inline]
fn source_to_static(source: &str) -> Cow<'static, str> {
    let pool = SOURCE_NAME_POOL.get_or_init(dashmap::DashMap::new);

    if let Some(interned) = pool.get(source) {
        return Cow::Borrowed(*interned);
    }

    let owned = source.to_string();
    let leaked: &'static str = Box::leak(owned.clone().into_boxed_str());
    pool.insert(owned, leaked);
    Cow::Borrowed(leaked)
}

/// Outcome label of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcomeLabel {
    /// Upstream answered and the store was updated.
    Success,
    /// Upstream failed and the stored value was served.
    Fallback,
    /// Upstream failed and nothing was stored.
    Failed,
}

impl RefreshOutcomeLabel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fallback => "fallback",
            Self::Failed => "failed",
        }
    }
}

pub const LOOKUP_FAILED_LABEL: &str = "error";

pub fn record_lookup(status: CacheStatus) {
    counter!("swr_lookups_total", "status" => status.as_str()).increment(1);
}

/// A miss whose inline refresh failed with nothing to fall back on.
pub fn record_lookup_failure() {
    counter!("swr_lookups_total", "status" => LOOKUP_FAILED_LABEL).increment(1);
}

pub fn record_refresh(outcome: RefreshOutcomeLabel) {
    counter!("swr_refresh_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_background_refresh_skipped() {
    counter!("swr_background_refresh_skipped_total").increment(1);
}

/// Records the wall time of one batched round trip, successful or not.
pub fn record_upstream_batch(source: &str, elapsed: Duration) {
    histogram!("swr_upstream_batch_duration_seconds", "source" => source_to_static(source))
        .record(elapsed.as_secs_f64());
}

pub fn record_upstream_error(source: &str, kind: &'static str) {
    counter!("swr_upstream_errors_total", "source" => source_to_static(source), "kind" => kind)
        .increment(1);
}

/// Records a per-id error inside an otherwise successful batch.
pub fn record_rpc_entry_error(source: &str, category: RpcErrorCategory) {
    counter!(
        "swr_rpc_entry_errors_total",
        "source" => source_to_static(source),
        "category" => category.as_str()
    )
    .increment(1);
}

pub fn record_persist_failure(sink: &'static str) {
    counter!("swr_persist_failures_total", "sink" => sink).increment(1);
}

/// Installs the global Prometheus recorder once and returns its handle.
///
/// If another recorder is already installed, a detached recorder is built so rendering still
/// works; its output will then be empty.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install prometheus recorder, using detached recorder");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

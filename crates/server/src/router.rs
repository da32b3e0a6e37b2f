use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swrpc_core::{lookup::LookupError, refresh::ContractSnapshot, runtime::SwrRuntime, swr::Lookup};
use tracing::{debug, warn};

/// Source used when the request does not name one.
pub const DEFAULT_CHAIN: &str = "ethereum";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SwrRuntime>,
    /// `None` when metrics are disabled.
    pub metrics: Option<PrometheusHandle>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/snapshot/{contract}", get(handle_snapshot))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    chain: Option<String>,
}

/// Response body of `/snapshot/{contract}`.
#[derive(Debug, Serialize)]
pub struct SnapshotBody {
    /// Checksummed contract address.
    pub contract: String,
    #[serde(flatten)]
    pub snapshot: ContractSnapshot,
    pub fetched_at: String,
}

impl From<Lookup> for SnapshotBody {
    fn from(lookup: Lookup) -> Self {
        Self {
            contract: lookup.key.subject().to_string(),
            fetched_at: lookup.fetched_at.to_rfc3339(),
            snapshot: lookup.snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

fn error_response(e: &LookupError) -> Response {
    let status = match e {
        LookupError::InvalidSubject(_) | LookupError::UnsupportedSource(_) => {
            StatusCode::BAD_REQUEST
        }
        LookupError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
    };

    (status, Json(ErrorBody { error: e.kind(), detail: e.to_string() })).into_response()
}

/// Serves the contract snapshot through the cache.
///
/// The `x-cache-status` header carries how the value was served.
pub async fn handle_snapshot(
    State(state): State<AppState>,
    Path(contract): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    let chain = query.chain.as_deref().unwrap_or(DEFAULT_CHAIN);

    match state.runtime.lookup().get(&contract, chain).await {
        Ok(lookup) => {
            let status = lookup.status;
            (
                StatusCode::OK,
                [("x-cache-status", status.as_str())],
                Json(SnapshotBody::from(lookup)),
            )
                .into_response()
        }
        Err(e) => {
            if matches!(e, LookupError::UpstreamUnavailable(_)) {
                warn!(contract = %contract, chain = %chain, error = %e, "snapshot lookup failed");
            } else {
                debug!(contract = %contract, chain = %chain, error = %e, "snapshot request rejected");
            }
            error_response(&e)
        }
    }
}

pub async fn handle_health(State(state): State<AppState>) -> Response {
    let report = state.runtime.health().await;
    let status = if report.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report)).into_response()
}

pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

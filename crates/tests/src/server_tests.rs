//! The HTTP router over a mocked upstream, driven with `oneshot`.

use crate::mock_infrastructure::{build_runtime, endpoint, manual_clock, RpcMockBuilder, CONTRACT};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use server::router::{create_router, AppState};
use std::{sync::Arc, time::Duration};
use swrpc_core::runtime::SwrRuntime;
use tower::ServiceExt;

async fn app(mock: &RpcMockBuilder) -> (Router, Arc<SwrRuntime>, Arc<swrpc_core::utils::ManualClock>) {
    let clock = manual_clock();
    let runtime = Arc::new(
        build_runtime(vec![endpoint("ethereum", &mock.url())], clock.clone(), Vec::new())
            .await
            .unwrap(),
    );
    let router = create_router(AppState { runtime: runtime.clone(), metrics: None });
    (router, runtime, clock)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let cache_status =
        response.headers().get("x-cache-status").map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cache_status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_cache_status_header_follows_freshness() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_snapshot_batch(2, "0x64", "0x3b9aca00", "0x10");
    let (app, runtime, clock) = app(&mock).await;
    let uri = format!("/snapshot/{CONTRACT}");

    let (status, cache_status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_status.as_deref(), Some("MISS"));
    assert_eq!(body["balance"], "100");

    assert_eq!(get(&app, &uri).await.1.as_deref(), Some("FRESH"));

    clock.advance(Duration::from_secs(11));
    assert_eq!(get(&app, &uri).await.1.as_deref(), Some("STALE"));

    assert!(runtime.components().refresher().drain(Duration::from_secs(5)).await);
    assert_eq!(get(&app, &uri).await.1.as_deref(), Some("FRESH"));

    mock.assert_hits().await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();
    let (app, runtime, _) = app(&mock).await;

    let (status, cache_status, body) = get(&app, &format!("/snapshot/{CONTRACT}")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(cache_status.is_none());
    assert_eq!(body["error"], "upstream_unavailable");
    assert!(body["detail"].as_str().unwrap().contains("upstream unavailable"));
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_unknown_chain_is_bad_request() {
    let mock = RpcMockBuilder::new().await;
    let (app, runtime, _) = app(&mock).await;

    let (status, _, body) = get(&app, &format!("/snapshot/{CONTRACT}?chain=bitcoin")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported_source");
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_health_lists_sources() {
    let mock = RpcMockBuilder::new().await;
    let (app, runtime, _) = app(&mock).await;

    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"][0], "ethereum");

    runtime.shutdown().await;
    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
}

//! `HttpBatchClient` against a real HTTP server.
//!
//! Covers id correlation, per-entry errors, whole-batch failures and timeouts.

use crate::mock_infrastructure::{
    endpoint,
    rpc_mock::{error_entry, result_entry, BALANCE_ID, BLOCK_NUMBER_ID, GAS_PRICE_ID},
    HangingUpstream, RpcMockBuilder, CONTRACT,
};
use serde_json::json;
use std::sync::Arc;
use swrpc_core::{
    refresh::{snapshot_batch, ContractSnapshot},
    upstream::{BatchTransport, HttpBatchClient, HttpClient, UpstreamError},
};

fn client() -> HttpBatchClient {
    HttpBatchClient::new(Arc::new(HttpClient::new().expect("http client")))
}

#[tokio::test]
async fn test_out_of_order_entries_match_by_id() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_batch("0x64", "0x3b9aca00", "0x10");

    let response = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap();

    assert_eq!(response.result(BALANCE_ID), Some(&json!("0x64")));
    assert_eq!(response.result(GAS_PRICE_ID), Some(&json!("0x3b9aca00")));
    assert_eq!(response.result(BLOCK_NUMBER_ID), Some(&json!("0x10")));
    assert!(mock.all_mocks_matched());
}

#[tokio::test]
async fn test_per_entry_error_leaves_other_entries_intact() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_entries(&[
        result_entry(BLOCK_NUMBER_ID, json!("0x10")),
        error_entry(GAS_PRICE_ID, -32005, "rate limit exceeded"),
        result_entry(BALANCE_ID, json!("0x64")),
    ]);

    let response = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap();

    assert_eq!(response.errors().count(), 1);

    let snapshot = ContractSnapshot::from_batch("ethereum", &response);
    assert_eq!(snapshot.balance.to_string(), "100");
    assert_eq!(snapshot.current_price, "0.000 Gwei");
    assert_eq!(snapshot.block_number, 16);
}

#[tokio::test]
async fn test_unrequested_ids_are_dropped() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_entries(&[
        result_entry(BALANCE_ID, json!("0x64")),
        result_entry(99, json!("0xdead")),
    ]);

    let response = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap();

    assert_eq!(response.len(), 1);
    assert_eq!(response.result(99), None);
}

#[tokio::test]
async fn test_http_500_is_http_error() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();

    let err = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::HttpError(500, _)), "got {err:?}");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_malformed_body();

    let err = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_envelope_error_is_rpc_error() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_envelope_error(-32600, "batch too large");

    let err = client()
        .send(&endpoint("ethereum", &mock.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::RpcError(-32600, _)), "got {err:?}");
}

#[tokio::test]
async fn test_hanging_upstream_times_out() {
    let upstream = HangingUpstream::start().await.unwrap();

    let started = std::time::Instant::now();
    let err = client()
        .send(&endpoint("ethereum", &upstream.url()), &snapshot_batch(CONTRACT))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Timeout), "got {err:?}");
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_refused_connection_is_connection_failed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client().send(&endpoint("ethereum", &url), &snapshot_batch(CONTRACT)).await.unwrap_err();

    assert!(matches!(err, UpstreamError::ConnectionFailed(_)), "got {err:?}");
}

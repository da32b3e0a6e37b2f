//! Resolved values reaching the sinks through a running runtime.
//!
//! Events are only guaranteed flushed after `shutdown()`, so every test shuts down before
//! inspecting a sink.

use crate::mock_infrastructure::{
    build_runtime, create_test_log, endpoint, manual_clock, RpcMockBuilder, CONTRACT,
};
use serde_json::Value;
use std::sync::Arc;
use swrpc_core::{
    cache::{CacheKey, Namespace},
    config::{AppConfig, ProviderConfig},
    ingest::LogCursor,
    persistence::{JsonFileSink, ResolvedSink, SqliteSink},
    runtime::SwrRuntime,
};

#[tokio::test]
async fn test_json_file_sink_records_every_lookup() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_batch("0x3635c9adc5dea00000", "0x5d21dba00", "0x1312d00");
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonFileSink::new(tmp.path()));
    let path = sink.path().to_path_buf();

    let runtime = build_runtime(
        vec![endpoint("ethereum", &mock.url())],
        manual_clock(),
        vec![sink as Arc<dyn ResolvedSink>],
    )
    .await
    .unwrap();

    runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    runtime.shutdown().await;

    let records: Vec<Value> =
        serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["contract"], CONTRACT);
    assert_eq!(records[0]["cache_status"], "MISS");
    assert_eq!(records[0]["balance"], "1000000000000000000000");
    assert_eq!(records[0]["current_price"], "25.000 Gwei");
    assert_eq!(records[1]["cache_status"], "FRESH");
}

#[tokio::test]
async fn test_failed_lookups_are_not_recorded() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonFileSink::new(tmp.path()));
    let path = sink.path().to_path_buf();

    let runtime = build_runtime(
        vec![endpoint("ethereum", &mock.url())],
        manual_clock(),
        vec![sink as Arc<dyn ResolvedSink>],
    )
    .await
    .unwrap();

    assert!(runtime.lookup().get(CONTRACT, "ethereum").await.is_err());
    runtime.shutdown().await;

    assert!(!path.exists());
}

#[tokio::test]
async fn test_sqlite_sink_writes_rows() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_batch("0x64", "0x3b9aca00", "0x10");
    let sink = Arc::new(SqliteSink::connect("sqlite::memory:").await.unwrap());

    let runtime = build_runtime(
        vec![endpoint("ethereum", &mock.url())],
        manual_clock(),
        vec![sink.clone() as Arc<dyn ResolvedSink>],
    )
    .await
    .unwrap();

    runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    runtime.shutdown().await;

    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT contract, chain, report FROM security_audits")
            .fetch_all(sink.pool())
            .await
            .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, CONTRACT);
    assert_eq!(rows[0].1, "ethereum");
    let report: Value = serde_json::from_str(&rows[0].2).unwrap();
    assert_eq!(report["block_number"], 16);
}

#[tokio::test]
async fn test_configured_log_ingest_stores_cursor() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_snapshot_batch("0x64", "0x3b9aca00", "0x10");
    mock.mock_get_logs(&[create_test_log(CONTRACT, 15, 0), create_test_log(CONTRACT, 16, 1)]);
    let tmp = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.sources.providers = vec![ProviderConfig {
        name: "ethereum".to_string(),
        https_url: mock.url(),
        timeout_ms: 1200,
    }];
    config.persistence.data_dir = tmp.path().display().to_string();
    config.persistence.json_file_enabled = false;
    config.ingest.enabled = true;

    let runtime = SwrRuntime::builder()
        .with_config(config)
        .with_clock(manual_clock())
        .build()
        .await
        .unwrap();
    assert_eq!(runtime.sink_names(), vec!["log_ingest"]);

    runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    runtime.shutdown().await;

    let key = CacheKey::new("ethereum", CONTRACT).in_namespace(Namespace::Logs);
    let entry = runtime.components().store().get(&key).await.unwrap().expect("cursor stored");
    let cursor: LogCursor = serde_json::from_str(&entry.payload).unwrap();

    assert_eq!(cursor.last_block, 16);
    assert_eq!(cursor.logs.len(), 2);
    assert!(mock.all_mocks_matched());
}

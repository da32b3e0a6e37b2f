//! Runtime construction and shutdown.
//!
//! - Configuration errors surface from `build()`, before anything is spawned
//! - Shutdown is idempotent and waits for background refreshes

use crate::mock_infrastructure::{build_runtime, endpoint, manual_clock, RpcMockBuilder, CONTRACT};
use std::time::Duration;
use swrpc_core::{
    config::{AppConfig, ProviderConfig},
    runtime::{RuntimeError, SwrRuntime},
    types::CacheStatus,
};
use tokio::time::timeout;

#[tokio::test]
async fn test_config_providers_become_sources() {
    let mut config = AppConfig::default();
    config.sources.providers = vec![
        ProviderConfig {
            name: "ethereum".to_string(),
            https_url: "http://127.0.0.1:1/eth".to_string(),
            timeout_ms: 500,
        },
        ProviderConfig {
            name: "polygon".to_string(),
            https_url: "http://127.0.0.1:1/polygon".to_string(),
            timeout_ms: 500,
        },
    ];
    config.persistence.json_file_enabled = false;

    let runtime = SwrRuntime::builder().with_config(config).build().await.unwrap();

    assert_eq!(runtime.components().registry().names(), vec!["ethereum", "polygon"]);
    assert!(runtime.sink_names().is_empty());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_invalid_ttls_fail_the_build() {
    let mut config = AppConfig::default();
    config.cache.fresh_ttl_seconds = 0;

    let result = SwrRuntime::builder().with_config(config).build().await;

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_empty_endpoint_list_fails_the_build() {
    let result = build_runtime(Vec::new(), manual_clock(), Vec::new()).await;

    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_shutdown_waits_for_background_refresh() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_snapshot_batch(2, "0x64", "0x3b9aca00", "0x10");
    let clock = manual_clock();
    let runtime =
        build_runtime(vec![endpoint("ethereum", &mock.url())], clock.clone(), Vec::new())
            .await
            .unwrap();

    runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    clock.advance(Duration::from_secs(20));
    let stale = runtime.lookup().get(CONTRACT, "ethereum").await.unwrap();
    assert_eq!(stale.status, CacheStatus::Stale);

    timeout(Duration::from_secs(10), runtime.shutdown()).await.expect("shutdown completes");

    assert_eq!(runtime.components().refresher().pending(), 0);
    mock.assert_hits().await;
}

#[tokio::test]
async fn test_shutdown_twice_and_health_afterwards() {
    let mock = RpcMockBuilder::new().await;
    let runtime = build_runtime(vec![endpoint("ethereum", &mock.url())], manual_clock(), Vec::new())
        .await
        .unwrap();

    assert!(runtime.health().await.ok);

    timeout(Duration::from_secs(5), runtime.shutdown()).await.unwrap();
    timeout(Duration::from_secs(5), runtime.shutdown()).await.unwrap();

    let health = runtime.health().await;
    assert!(!health.ok);
    assert!(health.store);
}

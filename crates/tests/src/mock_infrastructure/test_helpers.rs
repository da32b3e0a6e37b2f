//! Fixtures shared by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use swrpc_core::{
    cache::{CacheEntry, CacheKey, StoreError, ValueStore},
    config::AppConfig,
    persistence::ResolvedSink,
    runtime::{RuntimeError, SwrRuntime},
    upstream::Endpoint,
    utils::clock::ManualClock,
};
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};

/// A contract address in checksummed form.
pub const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// Timeout used for mock endpoints; short so hanging upstreams fail fast.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(300);

#[must_use]
pub fn endpoint(name: &str, url: &str) -> Endpoint {
    Endpoint::new(name, url, TEST_TIMEOUT)
}

/// Manual clock pinned to a fixed instant.
#[must_use]
pub fn manual_clock() -> Arc<ManualClock> {
    let start: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap_or_default();
    Arc::new(ManualClock::new(start))
}

/// Builds a runtime over real HTTP, with injected clock and sinks.
pub async fn build_runtime(
    endpoints: Vec<Endpoint>,
    clock: Arc<ManualClock>,
    sinks: Vec<Arc<dyn ResolvedSink>>,
) -> Result<SwrRuntime, RuntimeError> {
    SwrRuntime::builder()
        .with_config(AppConfig::default())
        .with_endpoints(endpoints)
        .with_clock(clock)
        .with_sinks(sinks)
        .build()
        .await
}

/// Accepts TCP connections and never writes a byte back.
pub struct HangingUpstream {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HangingUpstream {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        Ok(Self { addr, task })
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for HangingUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A store that ignores TTLs, like an external cache configured without eviction.
///
/// Lets tests reach entries older than the stale window.
#[derive(Default)]
pub struct RetainingStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl RetainingStore {
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ValueStore for RetainingStore {
    async fn put(&self, key: &CacheKey, entry: CacheEntry, _ttl: Duration) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }
}

/// A log entry as `eth_getLogs` returns it.
#[must_use]
pub fn create_test_log(address: &str, block_number: u64, log_index: u64) -> Value {
    json!({
        "address": address,
        "blockNumber": format!("0x{block_number:x}"),
        "blockHash": format!("0x{block_number:064x}"),
        "logIndex": format!("0x{log_index:x}"),
        "transactionHash": format!("0x{:064x}", block_number * 100 + log_index),
        "transactionIndex": "0x0",
        "topics": [format!("0x{log_index:064x}")],
        "data": "0x",
        "removed": false
    })
}

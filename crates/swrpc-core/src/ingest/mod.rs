//! Incremental event-log ingestion.
//!
//! [`LogIngestor`] is a [`ResolvedSink`]: every resolved contract advances a per-contract
//! cursor through one `eth_getLogs` round trip covering the blocks since the last pull.
//!
//! ```text
//! cursor stored?  ── yes ──► fromBlock = last_block + 1
//!        │ no
//!        ▼
//! fromBlock = block_number - lookback (floored at 0)
//!
//! toBlock = snapshot.block_number, skip when fromBlock > toBlock
//! ```
//!
//! A zero `block_number` is the decode default for a missing or failed `eth_blockNumber`
//! entry, not a real head: such events are skipped and never move the cursor.
//!
//! The cursor and the pulled logs live in the value store under the `logs` namespace with
//! a short expiry, so an expired cursor simply restarts from the lookback window.

use crate::{
    cache::{CacheEntry, CacheKey, Namespace, ValueStore},
    persistence::{PersistError, ResolvedEvent, ResolvedSink},
    types::JsonRpcRequest,
    upstream::{BatchTransport, SourceRegistry, UpstreamError},
    utils::{clock::Clock, quantity::format_quantity_u64},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace, warn};

pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

const GET_LOGS_ID: u64 = 1;

/// What the value store holds per contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCursor {
    pub last_block: u64,
    pub logs: Vec<Value>,
}

/// Inclusive block window of one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    /// Next window to pull, or `None` when the cursor already covers `head` or the head is
    /// unknown (zero).
    #[must_use]
    pub fn next(cursor: Option<u64>, head: u64, lookback: u64) -> Option<Self> {
        if head == 0 {
            return None;
        }
        let from = match cursor {
            Some(last_block) => last_block.checked_add(1)?,
            None => head.saturating_sub(lookback),
        };
        (from <= head).then_some(Self { from, to: head })
    }
}

pub struct LogIngestor {
    transport: Arc<dyn BatchTransport>,
    registry: Arc<SourceRegistry>,
    store: Arc<dyn ValueStore>,
    clock: Arc<dyn Clock>,
    lookback: u64,
    ttl: Duration,
}

impl LogIngestor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        registry: Arc<SourceRegistry>,
        store: Arc<dyn ValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            registry,
            store,
            clock,
            lookback: DEFAULT_LOOKBACK_BLOCKS,
            ttl: DEFAULT_TTL,
        }
    }

    #[must_use]
    pub fn with_lookback(mut self, lookback: u64) -> Self {
        self.lookback = lookback;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Reads the stored cursor for `key`. Unreadable cursors count as absent.
    pub async fn cursor(&self, key: &CacheKey) -> Option<LogCursor> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read log cursor");
                return None;
            }
        };
        serde_json::from_str(&entry.payload).ok()
    }

    async fn ingest(&self, event: &ResolvedEvent) -> Result<(), PersistError> {
        let endpoint = match self.registry.resolve(&event.snapshot.chain) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                debug!(chain = %event.snapshot.chain, error = %e, "no endpoint for resolved chain, skipping log pull");
                return Ok(());
            }
        };

        let key = CacheKey::new(endpoint.name.clone(), event.contract.as_str())
            .in_namespace(Namespace::Logs);
        if event.snapshot.block_number == 0 {
            debug!(key = %key, "snapshot has no block number, skipping log pull");
            return Ok(());
        }
        let cursor = self.cursor(&key).await.map(|c| c.last_block);

        let Some(range) = BlockRange::next(cursor, event.snapshot.block_number, self.lookback)
        else {
            trace!(key = %key, "log cursor up to date");
            return Ok(());
        };

        let request = JsonRpcRequest::new(
            GET_LOGS_ID,
            "eth_getLogs",
            json!([{
                "address": event.contract,
                "fromBlock": format_quantity_u64(range.from),
                "toBlock": format_quantity_u64(range.to),
            }]),
        );
        let response = self.transport.send(endpoint, std::slice::from_ref(&request)).await?;

        let logs = match response.get(GET_LOGS_ID) {
            Some(Ok(Value::Array(logs))) => logs.clone(),
            Some(Ok(other)) => {
                return Err(UpstreamError::InvalidResponse(format!(
                    "eth_getLogs returned {other}"
                ))
                .into())
            }
            Some(Err(e)) => return Err(UpstreamError::RpcError(e.code, e.message.clone()).into()),
            None => {
                return Err(
                    UpstreamError::InvalidResponse("eth_getLogs entry missing".to_string()).into()
                )
            }
        };

        debug!(key = %key, from = range.from, to = range.to, count = logs.len(), "logs ingested");

        let cursor = LogCursor { last_block: range.to, logs };
        let payload = serde_json::to_string(&cursor)?;
        self.store.put(&key, CacheEntry::new(payload, self.clock.now()), self.ttl).await?;

        Ok(())
    }
}

#[async_trait]
impl ResolvedSink for LogIngestor {
    fn name(&self) -> &'static str {
        "log_ingest"
    }

    /// Pulls logs for every event in order. A failing event does not stop the rest; the
    /// first failure is reported once the batch is done.
    async fn persist(&self, batch: &[ResolvedEvent]) -> Result<(), PersistError> {
        let mut first_error = None;

        for event in batch {
            if let Err(e) = self.ingest(event).await {
                warn!(contract = %event.contract, chain = %event.snapshot.chain, error = %e, "log ingestion failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

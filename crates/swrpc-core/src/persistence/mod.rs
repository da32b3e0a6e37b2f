//! Resolved-value notification and persistence.
//!
//! Every successful lookup emits a [`ResolvedEvent`] through [`ResolvedNotifier::notify`], a
//! non-blocking channel send. A single [`PersistenceWorker`] drains the channel in batches and
//! fans each batch out to the configured [`ResolvedSink`]s. Nothing flows back into the lookup
//! path: sink failures are logged and counted, never surfaced.
//!
//! # Worker Loop
//!
//! The worker batches up to [`MAX_BATCH`] events per pass. On shutdown it stops waiting, drains
//! whatever is still queued and flushes it before exiting.

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileSink;
pub use sqlite::SqliteSink;

use crate::{
    cache::StoreError, refresh::ContractSnapshot, swr::Lookup, types::CacheStatus,
    upstream::UpstreamError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

/// Upper bound on events handed to sinks per pass.
pub const MAX_BATCH: usize = 64;

/// One successfully resolved lookup.
///
/// Serialized flat: the snapshot fields sit next to `contract`, `cache_status` and
/// `resolved_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEvent {
    pub contract: String,
    #[serde(flatten)]
    pub snapshot: ContractSnapshot,
    pub cache_status: CacheStatus,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedEvent {
    #[must_use]
    pub fn from_lookup(lookup: &Lookup, resolved_at: DateTime<Utc>) -> Self {
        Self {
            contract: lookup.key.subject().to_string(),
            snapshot: lookup.snapshot.clone(),
            cache_status: lookup.status,
            resolved_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Consumer of resolved events.
#[async_trait]
pub trait ResolvedSink: Send + Sync {
    /// Short identifier used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Persists one batch.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the batch could not be written; the worker logs it and
    /// moves on.
    async fn persist(&self, batch: &[ResolvedEvent]) -> Result<(), PersistError>;
}

/// The `onResolved` hook handed to the lookup path.
#[derive(Debug, Clone)]
pub struct ResolvedNotifier {
    tx: Option<mpsc::UnboundedSender<ResolvedEvent>>,
}

impl ResolvedNotifier {
    /// Creates a connected notifier and the receiver the worker consumes.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResolvedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Notifier that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queues `event` without waiting. Events sent after the worker stopped are dropped.
    pub fn notify(&self, event: ResolvedEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                trace!("persistence worker stopped, dropping resolved event");
            }
        }
    }
}

pub struct PersistenceWorker {
    sinks: Vec<Arc<dyn ResolvedSink>>,
}

impl PersistenceWorker {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn ResolvedSink>>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Runs until shutdown is signalled or every notifier is dropped.
    pub async fn run(
        self,
        mut events_rx: mpsc::UnboundedReceiver<ResolvedEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut batch = Vec::with_capacity(MAX_BATCH);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    debug!("persistence worker received shutdown signal");
                    break;
                }

                maybe_event = events_rx.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("resolved event channel closed, worker exiting");
                        break;
                    };
                    batch.push(event);

                    while batch.len() < MAX_BATCH {
                        match events_rx.try_recv() {
                            Ok(event) => batch.push(event),
                            Err(_) => break,
                        }
                    }

                    self.flush(&mut batch).await;
                }
            }
        }

        let mut drained = 0usize;
        while let Ok(event) = events_rx.try_recv() {
            batch.push(event);
            drained += 1;
            if batch.len() == MAX_BATCH {
                self.flush(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
        if drained > 0 {
            debug!(count = drained, "persisted remaining events on shutdown");
        }

        info!("persistence worker shutdown complete");
    }

    async fn flush(&self, batch: &mut Vec<ResolvedEvent>) {
        for sink in &self.sinks {
            match sink.persist(batch).await {
                Ok(()) => trace!(sink = sink.name(), count = batch.len(), "batch persisted"),
                Err(e) => {
                    warn!(sink = sink.name(), count = batch.len(), error = %e, "failed to persist resolved events");
                    crate::metrics::record_persist_failure(sink.name());
                }
            }
        }
        batch.clear();
    }
}

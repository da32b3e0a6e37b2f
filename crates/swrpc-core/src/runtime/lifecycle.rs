//! Runtime lifecycle: component access, health and graceful shutdown.

use crate::{config::AppConfig, lookup::LookupService};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};

use super::{builder::SwrRuntimeBuilder, SwrComponents};

/// Liveness summary served by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    /// Whether the value store answered a ping.
    pub store: bool,
    pub sources: Vec<String>,
}

/// Owns all components and the persistence worker task.
///
/// `shutdown()` broadcasts the shutdown signal, waits for the persistence worker to flush
/// what is queued, then waits (bounded by `server.shutdown_timeout_seconds`) for background
/// refreshes. It is idempotent.
pub struct SwrRuntime {
    components: SwrComponents,
    shutdown_tx: broadcast::Sender<()>,
    config: AppConfig,
    worker_task: Mutex<Option<JoinHandle<()>>>,
    sink_names: Vec<&'static str>,
    shutdown_initiated: AtomicBool,
}

impl SwrRuntime {
    #[must_use]
    pub fn builder() -> SwrRuntimeBuilder {
        SwrRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: SwrComponents,
        shutdown_tx: broadcast::Sender<()>,
        config: AppConfig,
        worker_task: Option<JoinHandle<()>>,
        sink_names: Vec<&'static str>,
    ) -> Self {
        Self {
            components,
            shutdown_tx,
            config,
            worker_task: Mutex::new(worker_task),
            sink_names,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn components(&self) -> &SwrComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Convenience accessor for the lookup service.
    #[must_use]
    pub fn lookup(&self) -> &Arc<LookupService> {
        self.components.lookup()
    }

    /// Names of the sinks the persistence worker fans out to. Empty when persistence is off.
    #[must_use]
    pub fn sink_names(&self) -> &[&'static str] {
        &self.sink_names
    }

    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    pub async fn health(&self) -> HealthReport {
        let store = match self.components.store().ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "store ping failed");
                false
            }
        };

        HealthReport {
            ok: store && !self.is_shutting_down(),
            store,
            sources: self.components.registry().names(),
        }
    }

    /// Initiates graceful shutdown. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("shutdown already initiated, ignoring duplicate call");
            return;
        }

        info!("initiating swrpc runtime shutdown");
        if self.shutdown_tx.send(()).is_err() {
            debug!("no shutdown receivers");
        }

        let worker_task = self.worker_task.lock().take();
        if let Some(task) = worker_task {
            match task.await {
                Ok(()) => debug!("persistence worker completed"),
                Err(e) if e.is_cancelled() => debug!("persistence worker cancelled"),
                Err(e) => error!(error = %e, "persistence worker failed"),
            }
        }

        let timeout = self.config.shutdown_timeout();
        if !self.components.refresher().drain(timeout).await {
            warn!(
                timeout_secs = timeout.as_secs(),
                "background refreshes still running at shutdown"
            );
        }

        info!("swrpc runtime shutdown complete");
    }
}

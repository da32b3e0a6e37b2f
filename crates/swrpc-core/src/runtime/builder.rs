//! Builder for the runtime with injectable collaborators.

use crate::{
    cache::{MemoryStore, MemoryStoreConfig, ValueStore},
    config::AppConfig,
    ingest::LogIngestor,
    lookup::LookupService,
    normalize::{ChecksumNormalizer, KeyNormalizer},
    persistence::{
        JsonFileSink, PersistError, PersistenceWorker, ResolvedNotifier, ResolvedSink, SqliteSink,
    },
    refresh::RefreshExecutor,
    swr::{BackgroundRefresher, SwrCache},
    upstream::{
        BatchTransport, Endpoint, HttpBatchClient, HttpClient, RegistryError, SourceRegistry,
        UpstreamError,
    },
    utils::clock::{Clock, SystemClock},
};
use config::ConfigError;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{lifecycle::SwrRuntime, SwrComponents};

/// Errors that can occur during runtime initialization.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Upstream client initialization failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Persistence initialization failed: {0}")]
    Persistence(#[from] PersistError),
}

/// Builds a [`SwrRuntime`].
///
/// Every collaborator defaults to its production implementation derived from the
/// configuration; tests override the ones they need to control.
pub struct SwrRuntimeBuilder {
    config: Option<AppConfig>,
    endpoints: Option<Vec<Endpoint>>,
    transport: Option<Arc<dyn BatchTransport>>,
    store: Option<Arc<dyn ValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    normalizer: Option<Arc<dyn KeyNormalizer>>,
    sinks: Option<Vec<Arc<dyn ResolvedSink>>>,
    shutdown_channel_capacity: usize,
}

impl SwrRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            endpoints: None,
            transport: None,
            store: None,
            clock: None,
            normalizer: None,
            sinks: None,
            shutdown_channel_capacity: 16,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses these endpoints instead of resolving `sources.providers` from the environment.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn BatchTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn KeyNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Replaces the sinks the configuration would create. An empty list disables
    /// persistence.
    #[must_use]
    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn ResolvedSink>>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    #[must_use]
    pub fn with_shutdown_channel_capacity(mut self, capacity: usize) -> Self {
        self.shutdown_channel_capacity = capacity;
        self
    }

    /// Builds the runtime and starts the persistence worker.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the configuration is missing or invalid, a provider URL
    /// references an unset variable, or a sink cannot be opened.
    pub async fn build(self) -> Result<SwrRuntime, RuntimeError> {
        let config = self.config.ok_or_else(|| {
            RuntimeError::ConfigValidation("No configuration provided".to_string())
        })?;
        config.validate().map_err(RuntimeError::ConfigValidation)?;

        let endpoints = match self.endpoints {
            Some(endpoints) => endpoints,
            None => config.endpoints()?,
        };
        let registry = Arc::new(SourceRegistry::new(endpoints)?);
        if registry.is_empty() {
            return Err(RuntimeError::ConfigValidation("No upstream providers configured".into()));
        }

        info!(
            sources = ?registry.names(),
            fresh_ttl_secs = config.cache.fresh_ttl_seconds,
            stale_ttl_secs = config.cache.stale_ttl_seconds,
            "initializing swrpc runtime"
        );

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store: Arc<dyn ValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new(
                &MemoryStoreConfig { max_entries: config.cache.max_entries },
                clock.clone(),
            )),
        };
        debug!("value store initialized");

        let transport: Arc<dyn BatchTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpBatchClient::new(Arc::new(HttpClient::new()?))),
        };
        debug!("upstream transport initialized");

        let policy = config.freshness_policy();
        let executor = Arc::new(RefreshExecutor::new(
            transport.clone(),
            store.clone(),
            clock.clone(),
            policy.stale_ttl,
        ));
        let refresher = Arc::new(BackgroundRefresher::new(
            executor.clone(),
            config.cache.dedupe_background_refresh,
        ));
        let swr = Arc::new(SwrCache::new(
            store.clone(),
            executor.clone(),
            refresher.clone(),
            clock.clone(),
            policy,
        ));

        let sinks = match self.sinks {
            Some(sinks) => sinks,
            None => {
                Self::configured_sinks(&config, &transport, &registry, &store, &clock).await?
            }
        };

        let (shutdown_tx, _) = broadcast::channel::<()>(self.shutdown_channel_capacity);

        let (notifier, worker_task, sink_names) = if sinks.is_empty() {
            debug!("no resolved sinks configured, persistence disabled");
            (ResolvedNotifier::disabled(), None, Vec::new())
        } else {
            let worker = PersistenceWorker::new(sinks);
            let sink_names = worker.sink_names();
            info!(sinks = ?sink_names, "persistence worker started");
            let (notifier, events_rx) = ResolvedNotifier::channel();
            let handle = tokio::spawn(worker.run(events_rx, shutdown_tx.subscribe()));
            (notifier, Some(handle), sink_names)
        };

        let normalizer: Arc<dyn KeyNormalizer> =
            self.normalizer.unwrap_or_else(|| Arc::new(ChecksumNormalizer));
        let lookup = Arc::new(LookupService::new(
            registry.clone(),
            normalizer,
            swr.clone(),
            notifier,
            clock.clone(),
        ));

        let components =
            SwrComponents::new(registry, store, transport, clock, executor, refresher, swr, lookup);

        info!("swrpc runtime initialization complete");

        Ok(SwrRuntime::new(components, shutdown_tx, config, worker_task, sink_names))
    }

    async fn configured_sinks(
        config: &AppConfig,
        transport: &Arc<dyn BatchTransport>,
        registry: &Arc<SourceRegistry>,
        store: &Arc<dyn ValueStore>,
        clock: &Arc<dyn Clock>,
    ) -> Result<Vec<Arc<dyn ResolvedSink>>, RuntimeError> {
        let mut sinks: Vec<Arc<dyn ResolvedSink>> = Vec::new();

        if config.persistence.json_file_enabled {
            sinks.push(Arc::new(JsonFileSink::new(&config.persistence.data_dir)));
        }

        if let Some(url) = &config.persistence.sqlite_url {
            sinks.push(Arc::new(SqliteSink::connect(url).await?));
        }

        if config.ingest.enabled {
            let ingestor =
                LogIngestor::new(transport.clone(), registry.clone(), store.clone(), clock.clone())
                    .with_lookback(config.ingest.lookback_blocks)
                    .with_ttl(Duration::from_secs(config.ingest.ttl_seconds));
            sinks.push(Arc::new(ingestor));
        }

        Ok(sinks)
    }
}

impl Default for SwrRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

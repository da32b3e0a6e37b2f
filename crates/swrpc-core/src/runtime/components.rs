//! Core component container for the runtime.

use crate::{
    cache::ValueStore,
    lookup::LookupService,
    refresh::RefreshExecutor,
    swr::{BackgroundRefresher, SwrCache},
    upstream::{BatchTransport, SourceRegistry},
    utils::clock::Clock,
};
use std::sync::Arc;

/// Container for all initialized components.
///
/// Everything is behind `Arc`; cloning the container is cheap.
#[derive(Clone)]
pub struct SwrComponents {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn ValueStore>,
    transport: Arc<dyn BatchTransport>,
    clock: Arc<dyn Clock>,
    executor: Arc<RefreshExecutor>,
    refresher: Arc<BackgroundRefresher>,
    swr: Arc<SwrCache>,
    lookup: Arc<LookupService>,
}

impl SwrComponents {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<SourceRegistry>,
        store: Arc<dyn ValueStore>,
        transport: Arc<dyn BatchTransport>,
        clock: Arc<dyn Clock>,
        executor: Arc<RefreshExecutor>,
        refresher: Arc<BackgroundRefresher>,
        swr: Arc<SwrCache>,
        lookup: Arc<LookupService>,
    ) -> Self {
        Self { registry, store, transport, clock, executor, refresher, swr, lookup }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ValueStore> {
        &self.store
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn BatchTransport> {
        &self.transport
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<RefreshExecutor> {
        &self.executor
    }

    #[must_use]
    pub fn refresher(&self) -> &Arc<BackgroundRefresher> {
        &self.refresher
    }

    #[must_use]
    pub fn swr(&self) -> &Arc<SwrCache> {
        &self.swr
    }

    #[must_use]
    pub fn lookup(&self) -> &Arc<LookupService> {
        &self.lookup
    }
}

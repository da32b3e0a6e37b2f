//! Background refresh scheduling.
//!
//! Stale reads hand their key to [`BackgroundRefresher::spawn`] and return immediately. The
//! refresh runs as a detached tokio task; its outcome only reaches later readers through the
//! store, and failures are logged and counted here.
//!
//! # In-Flight Guard
//!
//! With deduplication enabled, a key already being refreshed in the background is skipped.
//! The key is removed from the in-flight set by an RAII guard owned by the task, so a panic
//! inside the refresh still releases it.
//!
//! ```text
//! spawn(key) ──► [dedupe && key in flight?] ── yes ──► skipped (counted)
//!                         │ no
//!                         ▼
//!                 insert key, pending += 1
//!                         │
//!                 tokio::spawn(refresh) ──► drop guards: remove key, pending -= 1, notify
//! ```

use crate::{
    cache::CacheKey,
    metrics,
    refresh::RefreshExecutor,
    upstream::Endpoint,
};
use dashmap::DashSet;
use std::{
    pin::pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::Notify, time::Instant};
use tracing::{debug, trace, warn};

#[derive(Default)]
struct PendingTasks {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when the task ends, however it ends.
struct PendingGuard {
    pending: Arc<PendingTasks>,
}

impl PendingGuard {
    fn new(pending: Arc<PendingTasks>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.pending.idle.notify_waiters();
        }
    }
}

/// Removes the key from the in-flight set on drop.
struct InflightGuard {
    inflight: Arc<DashSet<CacheKey>>,
    key: CacheKey,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
        trace!(key = %self.key, "background refresh slot released");
    }
}

/// Fire-and-forget refresh scheduler.
pub struct BackgroundRefresher {
    executor: Arc<RefreshExecutor>,
    inflight: Arc<DashSet<CacheKey>>,
    pending: Arc<PendingTasks>,
    dedupe: bool,
}

impl BackgroundRefresher {
    #[must_use]
    pub fn new(executor: Arc<RefreshExecutor>, dedupe: bool) -> Self {
        Self {
            executor,
            inflight: Arc::new(DashSet::new()),
            pending: Arc::new(PendingTasks::default()),
            dedupe,
        }
    }

    /// Launches a background refresh for `key`.
    ///
    /// Returns `false` when the refresh was skipped because one is already in flight.
    pub fn spawn(&self, key: CacheKey, endpoint: Endpoint) -> bool {
        let inflight_guard = if self.dedupe {
            if !self.inflight.insert(key.clone()) {
                debug!(key = %key, "background refresh already in flight, skipping");
                metrics::record_background_refresh_skipped();
                return false;
            }
            Some(InflightGuard { inflight: Arc::clone(&self.inflight), key: key.clone() })
        } else {
            None
        };

        let pending_guard = PendingGuard::new(Arc::clone(&self.pending));
        let executor = Arc::clone(&self.executor);

        tokio::spawn(async move {
            let _pending = pending_guard;
            let _inflight = inflight_guard;

            match executor.refresh(&key, &endpoint).await {
                Ok(refreshed) if refreshed.fallback => {
                    debug!(key = %key, "background refresh kept stored value");
                }
                Ok(_) => trace!(key = %key, "background refresh completed"),
                Err(e) => warn!(key = %key, error = %e, "background refresh failed"),
            }
        });

        true
    }

    /// Number of background refreshes not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Returns `true` if a background refresh for `key` is in flight.
    ///
    /// Always `false` with deduplication disabled.
    #[must_use]
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.inflight.contains(key)
    }

    /// Waits until no background refresh is pending or `timeout` elapses.
    ///
    /// Returns `true` if everything finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            let mut notified = pin!(self.pending.idle.notified());
            notified.as_mut().enable();

            if self.pending() == 0 {
                return true;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let remaining = self.pending();
                if remaining > 0 {
                    warn!(remaining, "background refreshes still running after drain timeout");
                }
                return remaining == 0;
            }
        }
    }
}

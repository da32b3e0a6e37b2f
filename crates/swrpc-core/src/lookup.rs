//! Public lookup entry point.

use crate::{
    normalize::{KeyNormalizer, NormalizeError},
    persistence::{ResolvedEvent, ResolvedNotifier},
    refresh::RefreshError,
    swr::{Lookup, SwrCache},
    upstream::{RegistryError, SourceRegistry},
    utils::clock::Clock,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidSubject(#[from] NormalizeError),

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] RefreshError),
}

impl LookupError {
    /// Stable machine-readable label, used in error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSubject(_) => "invalid_subject",
            Self::UnsupportedSource(_) => "unsupported_source",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }
}

impl From<RegistryError> for LookupError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnsupportedSource(source) | RegistryError::DuplicateSource(source) => {
                Self::UnsupportedSource(source)
            }
        }
    }
}

/// Resolves the source, normalizes the subject, serves through the SWR policy and notifies
/// persistence of the served value.
pub struct LookupService {
    registry: Arc<SourceRegistry>,
    normalizer: Arc<dyn KeyNormalizer>,
    swr: Arc<SwrCache>,
    notifier: ResolvedNotifier,
    clock: Arc<dyn Clock>,
}

impl LookupService {
    #[must_use]
    pub fn new(
        registry: Arc<SourceRegistry>,
        normalizer: Arc<dyn KeyNormalizer>,
        swr: Arc<SwrCache>,
        notifier: ResolvedNotifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { registry, normalizer, swr, notifier, clock }
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Looks up `raw_subject` on `source`.
    ///
    /// Unknown sources and malformed subjects are rejected before any store or network
    /// access.
    ///
    /// # Errors
    ///
    /// - [`LookupError::UnsupportedSource`] if `source` is not configured.
    /// - [`LookupError::InvalidSubject`] if `raw_subject` does not normalize.
    /// - [`LookupError::UpstreamUnavailable`] on a miss whose refresh failed with nothing
    ///   stored.
    pub async fn get(&self, raw_subject: &str, source: &str) -> Result<Lookup, LookupError> {
        let endpoint = self.registry.resolve(source)?;
        let key = self.normalizer.normalize(raw_subject, &endpoint.name)?;

        let lookup = self.swr.get(&key, endpoint).await?;

        self.notifier.notify(ResolvedEvent::from_lookup(&lookup, self.clock.now()));
        debug!(key = %key, status = lookup.status.as_str(), "lookup resolved");

        Ok(lookup)
    }
}

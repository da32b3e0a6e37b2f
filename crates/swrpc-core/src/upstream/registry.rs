use std::{collections::HashMap, fmt, sync::Arc, time::Duration};
use thiserror::Error;

/// One addressable upstream node.
#[derive(Clone)]
pub struct Endpoint {
    pub name: Arc<str>,
    pub url: Arc<str>,
    pub timeout: Duration,
}

impl Endpoint {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, url: impl Into<Arc<str>>, timeout: Duration) -> Self {
        Self { name: name.into(), url: url.into(), timeout }
    }
}

// URLs carry API keys, keep them out of debug output.
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("url", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("duplicate source: {0}")]
    DuplicateSource(String),
}

/// Maps source identifiers to endpoints.
///
/// Lookup is trimmed and case-insensitive; canonical names are stored lower-case, so the
/// name on a resolved [`Endpoint`] is what goes into cache keys.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    endpoints: HashMap<String, Endpoint>,
}

impl SourceRegistry {
    /// Builds a registry, rejecting names that collide after canonicalization.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSource`] on collision.
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();
        for endpoint in endpoints {
            let canonical = canonical_name(&endpoint.name);
            let endpoint = Endpoint { name: Arc::from(canonical.as_str()), ..endpoint };
            if map.insert(canonical.clone(), endpoint).is_some() {
                return Err(RegistryError::DuplicateSource(canonical));
            }
        }
        Ok(Self { endpoints: map })
    }

    /// Resolves a source identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedSource`] for unknown identifiers.
    pub fn resolve(&self, source: &str) -> Result<&Endpoint, RegistryError> {
        self.endpoints
            .get(&canonical_name(source))
            .ok_or_else(|| RegistryError::UnsupportedSource(source.trim().to_string()))
    }

    /// Sorted list of configured source names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn canonical_name(source: &str) -> String {
    source.trim().to_ascii_lowercase()
}

//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `Default` implementations below
//! 2. **Config file**: TOML file named by the `SWRPC_CONFIG` env var, `config/config.toml`
//!    otherwise. A missing file is not an error.
//! 3. **Environment variables**: `SWRPC__SECTION__FIELD`, e.g. `SWRPC__SERVER__PORT=8080`
//!
//! Provider URLs may carry `${VAR}` placeholders so API keys stay out of the file. They are
//! resolved from the process environment by [`AppConfig::endpoints`]; a placeholder naming an
//! unset variable is an error.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [cache]
//! fresh_ttl_seconds = 10
//! stale_ttl_seconds = 120
//!
//! [[sources.providers]]
//! name = "ethereum"
//! https_url = "https://mainnet.infura.io/v3/${INFURA_KEY}"
//! timeout_ms = 800
//! ```

use crate::{cache::FreshnessPolicy, upstream::Endpoint};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, path::Path, time::Duration};

pub const CONFIG_PATH_ENV: &str = "SWRPC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Upper bound on waiting for background work during shutdown.
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 3030, shutdown_timeout_seconds: 5 }
    }
}

/// One upstream JSON-RPC provider, addressed by its source identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Source identifier callers use, e.g. `"ethereum"`.
    pub name: String,
    pub https_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub providers: Vec<ProviderConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderConfig {
                    name: "ethereum".to_string(),
                    https_url: "https://mainnet.infura.io/v3/${INFURA_KEY}".to_string(),
                    timeout_ms: default_timeout_ms(),
                },
                ProviderConfig {
                    name: "polygon".to_string(),
                    https_url: "https://polygon-mainnet.infura.io/v3/${INFURA_KEY}".to_string(),
                    timeout_ms: default_timeout_ms(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries younger than this are served without any upstream access.
    pub fresh_ttl_seconds: u64,
    /// Entries older than this are gone; the store expires them.
    pub stale_ttl_seconds: u64,
    pub max_entries: u64,
    /// Skip a background refresh when one for the same key is already running.
    pub dedupe_background_refresh: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_seconds: 10,
            stale_ttl_seconds: 120,
            max_entries: 100_000,
            dedupe_background_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub data_dir: String,
    pub json_file_enabled: bool,
    /// e.g. `sqlite://data/audits.db`. Disabled when unset.
    pub sqlite_url: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { data_dir: "data".to_string(), json_file_enabled: true, sqlite_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub enabled: bool,
    pub lookback_blocks: u64,
    pub ttl_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { enabled: false, lookback_blocks: 100, ttl_seconds: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `"pretty"` or `"json"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            persistence: PersistenceConfig::default(),
            ingest: IngestConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or a value has the wrong type.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(config_path.as_ref()).required(false))
            .add_source(Environment::with_prefix("SWRPC").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Loads from `$SWRPC_CONFIG`, or `config/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// # Errors
    ///
    /// Returns an error string if the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .map_err(|_| {
                format!("Invalid socket address: {}:{}", self.server.bind_address, self.server.port)
            })
    }

    #[must_use]
    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(
            Duration::from_secs(self.cache.fresh_ttl_seconds),
            Duration::from_secs(self.cache.stale_ttl_seconds),
        )
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_seconds)
    }

    /// Builds endpoints with `${VAR}` placeholders resolved from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Message`] naming the first unset variable or unterminated
    /// placeholder.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        self.endpoints_with(|name| std::env::var(name).ok())
    }

    /// [`AppConfig::endpoints`] with an explicit variable lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::endpoints`].
    pub fn endpoints_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<Endpoint>, ConfigError> {
        self.sources
            .providers
            .iter()
            .map(|provider| {
                let url = resolve_placeholders(&provider.https_url, &lookup).map_err(|e| {
                    ConfigError::Message(format!("provider {}: {e}", provider.name))
                })?;
                Ok(Endpoint::new(
                    provider.name.as_str(),
                    url,
                    Duration::from_millis(provider.timeout_ms),
                ))
            })
            .collect()
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.sources.providers.is_empty() {
            return Err("No upstream providers configured".to_string());
        }

        let mut seen = HashSet::new();
        for provider in &self.sources.providers {
            let name = provider.name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err("Provider name must not be empty".to_string());
            }
            if !seen.insert(name) {
                return Err(format!("Duplicate provider name: {}", provider.name));
            }
            if !provider.https_url.starts_with("http://")
                && !provider.https_url.starts_with("https://")
            {
                return Err(format!("Invalid URL for provider {}", provider.name));
            }
            if provider.timeout_ms == 0 {
                return Err(format!("Timeout must be greater than 0 for provider {}", provider.name));
            }
        }

        if self.cache.fresh_ttl_seconds == 0 {
            return Err("Fresh TTL must be greater than 0".to_string());
        }

        if self.cache.stale_ttl_seconds < self.cache.fresh_ttl_seconds {
            return Err("Stale TTL must not be shorter than fresh TTL".to_string());
        }

        if self.cache.max_entries == 0 {
            return Err("Cache max entries must be greater than 0".to_string());
        }

        if self.server.port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        if self.ingest.enabled && self.ingest.ttl_seconds == 0 {
            return Err("Ingest TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Replaces every `${NAME}` in `raw` with `lookup(NAME)`.
///
/// # Errors
///
/// Returns a message for an unset variable or an unterminated `${`.
pub fn resolve_placeholders(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, String> {
    let mut resolved = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| "unterminated placeholder".to_string())?;
        let name = &after[..end];
        let value = lookup(name).ok_or_else(|| format!("environment variable {name} is not set"))?;
        resolved.push_str(&value);
        rest = &after[end + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

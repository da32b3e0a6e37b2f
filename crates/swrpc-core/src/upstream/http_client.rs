use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::upstream::UpstreamError;

const MAX_ERROR_BODY_LEN: usize = 256;

/// Configuration for HTTP client concurrency.
///
/// Permit acquisition gets a shorter timeout when permits run scarce, so a saturated client
/// fails fast instead of queueing lookups behind the upstream.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds under normal load
    pub permit_timeout_ms: u64,
    /// Permit acquisition timeout in milliseconds when permits are scarce
    pub permit_timeout_scarce_ms: u64,
    /// Number of available permits below which they are considered scarce
    pub scarce_permit_threshold: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 256,
            permit_timeout_ms: 500,
            permit_timeout_scarce_ms: 200,
            scarce_permit_threshold: 16,
        }
    }
}

/// HTTP client with semaphore-based concurrency control.
///
/// Each call is exactly one POST. There are no inline retries: a failed refresh falls back
/// to the stored value and the next lookup tries again.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

/// RAII guard ensuring semaphore permits are always released.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Sanitizes network errors so endpoint URLs (and the keys inside them) never leak.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .connect_timeout(Duration::from_secs(2))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("swrpc/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Sends one HTTP POST with a JSON body.
    ///
    /// `timeout` is one deadline for the whole call: waiting for a permit, the exchange and
    /// reading the body all count against it.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if permit acquisition or the request times out
    /// - [`UpstreamError::ConcurrencyLimit`] if the semaphore is closed
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::ConnectionFailed`] for sanitized network failures
    pub async fn send_request(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
    ) -> Result<bytes::Bytes, UpstreamError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let permit_timeout =
            if self.concurrent_limit.available_permits() < self.config.scarce_permit_threshold {
                Duration::from_millis(self.config.permit_timeout_scarce_ms)
            } else {
                Duration::from_millis(self.config.permit_timeout_ms)
            };

        let permit = tokio::time::timeout(
            permit_timeout.min(timeout),
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            UpstreamError::Timeout
        })?
        .map_err(|_| {
            tracing::warn!(
                available_permits = self.concurrent_limit.available_permits(),
                "http client concurrency limit reached"
            );
            UpstreamError::ConcurrencyLimit("semaphore closed".to_string())
        })?;

        let permit_guard = PermitGuard::new(permit, self.concurrent_limit.clone());

        tracing::trace!(
            available_permits = permit_guard.available_permits(),
            "http request started"
        );

        let outcome = match tokio::time::timeout_at(deadline, self.exchange(url, body)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::trace!(timeout_ms = timeout.as_millis() as u64, "http request timeout");
                return Err(UpstreamError::Timeout);
            }
        };

        match outcome {
            Ok(Ok(bytes)) => {
                tracing::trace!(
                    available_permits = permit_guard.available_permits(),
                    "http request completed"
                );
                Ok(bytes)
            }
            Ok(Err((status, text))) => {
                tracing::trace!(status = status, "http request failed");
                Err(UpstreamError::HttpError(status, text))
            }
            Err(e) if e.is_timeout() => Err(UpstreamError::Timeout),
            Err(e) => Err(UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))),
        }
    }

    /// Performs the POST and reads the body. Non-success statuses come back as the inner error.
    async fn exchange(
        &self,
        url: &str,
        body: bytes::Bytes,
    ) -> Result<Result<bytes::Bytes, (u16, String)>, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response.bytes().await?));
        }

        let raw_text = response.text().await.unwrap_or_default();
        Ok(Err((status.as_u16(), truncate_body(raw_text))))
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

/// Truncates an error body on a char boundary.
fn truncate_body(mut text: String) -> String {
    if text.len() <= MAX_ERROR_BODY_LEN {
        return text;
    }
    let mut cut = MAX_ERROR_BODY_LEN;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str("... (truncated)");
    text
}

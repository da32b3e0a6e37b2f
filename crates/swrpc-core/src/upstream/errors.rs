use thiserror::Error;

/// Classification of per-id JSON-RPC errors found inside an otherwise successful batch.
///
/// Per-id errors never fail the batch; the category only decides how loudly they are logged
/// and which metric label they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCategory {
    /// Invalid request, method not found, invalid params.
    ClientError,
    /// Internal or server-defined errors on the node side.
    ProviderError,
    /// Rate limiting at JSON-RPC level (-32005).
    RateLimit,
    /// Node could not parse the request.
    ParseError,
    /// Call reverted or ran out of gas.
    ExecutionError,
}

impl RpcErrorCategory {
    /// Classifies a JSON-RPC error code and message.
    ///
    /// Standard codes map directly. In the server range (-32000 to -32099) the message is
    /// inspected to tell reverts apart from node failures.
    #[must_use]
    pub fn from_code_and_message(code: i32, message: &str) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32602..=-32600 => Self::ClientError,
            -32005 => Self::RateLimit,
            -32099..=-32000 => {
                let message_lower = message.to_lowercase();
                if message_lower.contains("revert") || message_lower.contains("out of gas") {
                    Self::ExecutionError
                } else {
                    Self::ProviderError
                }
            }
            _ => Self::ProviderError,
        }
    }

    /// Returns `true` if a later refresh may succeed where this one failed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ProviderError)
    }

    /// Returns a static string representation for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError => "client_error",
            Self::ProviderError => "provider_error",
            Self::RateLimit => "rate_limit",
            Self::ParseError => "parse_error",
            Self::ExecutionError => "execution_error",
        }
    }
}

/// Whole-batch failures talking to an upstream node.
///
/// Every variant fails the complete round trip. Messages are short diagnostics and never
/// contain the endpoint URL, which usually embeds an API key.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx HTTP status. First field is the status code, second a truncated body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// The upstream answered the whole batch with a single JSON-RPC error object.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// Response envelope could not be parsed or did not match the batch.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The batch was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Maximum concurrent requests to the endpoint has been reached.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
}

impl UpstreamError {
    /// Returns the RPC error category if this is an envelope-level RPC error.
    #[must_use]
    pub fn rpc_category(&self) -> Option<RpcErrorCategory> {
        match self {
            Self::RpcError(code, message) => {
                Some(RpcErrorCategory::from_code_and_message(*code, message))
            }
            _ => None,
        }
    }

    /// Returns `true` if the failure is likely to clear on a later refresh.
    ///
    /// Timeouts, connection problems, 5xx and 429 statuses, and transient RPC categories.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) | Self::ConcurrencyLimit(_) => true,
            Self::HttpError(status, _) => (500..=599).contains(status) || *status == 429,
            Self::RpcError(_, _) => self.rpc_category().is_some_and(|cat| cat.is_transient()),
            Self::InvalidResponse(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Short label for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::HttpError(_, _) => "http_error",
            Self::RpcError(_, _) => "rpc_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ConcurrencyLimit(_) => "concurrency_limit",
        }
    }
}

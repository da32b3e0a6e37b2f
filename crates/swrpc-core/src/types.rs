//! Core type definitions for the JSON-RPC batch envelope and lookup status.
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: one entry of a batched
//!   exchange. Requests carry a caller-assigned numeric correlation id.
//!
//! ## Lookup Types
//! - [`CacheStatus`]: how a lookup was served, exposed to callers as `x-cache-status`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// How a lookup was served.
///
/// # Example
///
/// ```
/// use swrpc_core::types::CacheStatus;
///
/// assert_eq!(CacheStatus::Stale.to_string(), "STALE");
/// assert!(CacheStatus::Fresh.is_cache_hit());
/// assert!(!CacheStatus::Miss.is_cache_hit());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStatus {
    /// Stored value younger than the fresh window; no upstream access.
    Fresh,
    /// Stored value past the fresh window; served as-is while a background refresh runs.
    Stale,
    /// No usable stored value; fetched from the upstream before returning.
    Miss,
    /// The inline refresh failed and the last stored value was served instead.
    Fallback,
}

impl CacheStatus {
    /// Returns a static string representation for metrics labels and headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "FRESH",
            Self::Stale => "STALE",
            Self::Miss => "MISS",
            Self::Fallback => "FALLBACK",
        }
    }

    /// Returns `true` if the value came from the store without waiting on the upstream.
    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::Fresh | Self::Stale)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One JSON-RPC 2.0 request inside a batch.
///
/// The `id` is assigned by the caller and must be unique within the batch; responses are
/// matched back by id, never by position.
///
/// # Example
///
/// ```
/// use swrpc_core::types::JsonRpcRequest;
///
/// let request = JsonRpcRequest::new(2, "eth_gasPrice", serde_json::json!([]));
/// assert_eq!(request.method, "eth_gasPrice");
/// assert_eq!(request.id, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub id: u64,
    pub method: Cow<'static, str>,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(id: u64, method: impl Into<Cow<'static, str>>, params: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, id, method: method.into(), params }
    }
}

/// One JSON-RPC 2.0 response entry.
///
/// Contains either a `result` or an `error`. The `id` is kept as a raw JSON value because
/// upstreams may echo it as a number, a string, or `null` for envelope-level failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: Cow<'static, str>,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

fn default_version() -> Cow<'static, str> {
    JSONRPC_VERSION_COW
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, id: Value::from(id), result: Some(result), error: None }
    }

    #[must_use]
    pub fn error(id: u64, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            id: Value::from(id),
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }

    /// Returns the numeric correlation id, accepting numbers and numeric strings.
    #[must_use]
    pub fn correlation_id(&self) -> Option<u64> {
        match &self.id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard codes: `-32700` parse error, `-32600` invalid request, `-32601` method not found,
/// `-32602` invalid params, `-32603` internal error, `-32000..=-32099` server-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

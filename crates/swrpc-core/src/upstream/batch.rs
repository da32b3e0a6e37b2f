//! Batched JSON-RPC transport.
//!
//! One network exchange carries every sub-request; results come back keyed by correlation id.
//! A transport-level failure fails the whole batch, while per-id errors only affect their own
//! entry.

use crate::{
    metrics,
    types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse},
    upstream::{
        errors::{RpcErrorCategory, UpstreamError},
        http_client::HttpClient,
        registry::Endpoint,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, trace, warn};

/// Results of one batch, keyed by correlation id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    entries: HashMap<u64, Result<Value, JsonRpcError>>,
}

impl BatchResponse {
    /// Builds a response from raw entries. Entries without a usable id are dropped.
    ///
    /// A successful entry without a `result` field maps to JSON `null`.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = JsonRpcResponse>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            let Some(id) = entry.correlation_id() else {
                trace!(id = %entry.id, "dropping batch entry without numeric id");
                continue;
            };
            let outcome = match entry.error {
                Some(error) => Err(error),
                None => Ok(entry.result.unwrap_or(Value::Null)),
            };
            map.insert(id, outcome);
        }
        Self { entries: map }
    }

    /// Entry for `id`, if the upstream returned one.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Result<Value, JsonRpcError>> {
        self.entries.get(&id)
    }

    /// Successful result for `id`; `None` for absent or errored entries.
    #[must_use]
    pub fn result(&self, id: u64) -> Option<&Value> {
        self.entries.get(&id).and_then(|entry| entry.as_ref().ok())
    }

    /// Per-id errors in id order.
    pub fn errors(&self) -> impl Iterator<Item = (u64, &JsonRpcError)> {
        let mut errors: Vec<_> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| entry.as_ref().err().map(|e| (*id, e)))
            .collect();
        errors.sort_by_key(|(id, _)| *id);
        errors.into_iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn retain_requested(&mut self, requested: &HashSet<u64>) {
        self.entries.retain(|id, _| requested.contains(id));
    }
}

/// Sends a batch of JSON-RPC calls to one endpoint in a single exchange.
///
/// Implementations must be safe to share across all keys and callers.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the exchange as a whole fails.
    async fn send(
        &self,
        endpoint: &Endpoint,
        calls: &[JsonRpcRequest],
    ) -> Result<BatchResponse, UpstreamError>;
}

/// [`BatchTransport`] over HTTP POST.
pub struct HttpBatchClient {
    http: Arc<HttpClient>,
}

impl HttpBatchClient {
    #[must_use]
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    fn validate(calls: &[JsonRpcRequest]) -> Result<HashSet<u64>, UpstreamError> {
        if calls.is_empty() {
            return Err(UpstreamError::InvalidRequest("empty batch".to_string()));
        }

        let mut ids = HashSet::with_capacity(calls.len());
        for call in calls {
            if !ids.insert(call.id) {
                return Err(UpstreamError::InvalidRequest(format!(
                    "duplicate correlation id {}",
                    call.id
                )));
            }
        }
        Ok(ids)
    }

    /// Decodes a batch response body.
    ///
    /// An array is the normal case. A single object carrying `error` means the node rejected
    /// the batch as a whole. Anything else is malformed.
    fn parse_body(body: &[u8]) -> Result<BatchResponse, UpstreamError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| UpstreamError::InvalidResponse("response is not JSON".to_string()))?;

        match value {
            Value::Array(items) => {
                let entries = items
                    .into_iter()
                    .map(serde_json::from_value::<JsonRpcResponse>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        UpstreamError::InvalidResponse(format!("malformed batch entry: {e}"))
                    })?;
                Ok(BatchResponse::from_entries(entries))
            }
            Value::Object(mut object) => match object.remove("error") {
                Some(error) => {
                    let error: JsonRpcError = serde_json::from_value(error).map_err(|_| {
                        UpstreamError::InvalidResponse("malformed error object".to_string())
                    })?;
                    Err(UpstreamError::RpcError(error.code, error.message))
                }
                None => Err(UpstreamError::InvalidResponse("expected a batch array".to_string())),
            },
            _ => Err(UpstreamError::InvalidResponse("expected a batch array".to_string())),
        }
    }
}

#[async_trait]
impl BatchTransport for HttpBatchClient {
    async fn send(
        &self,
        endpoint: &Endpoint,
        calls: &[JsonRpcRequest],
    ) -> Result<BatchResponse, UpstreamError> {
        let requested = Self::validate(calls)?;

        let body = serde_json::to_vec(calls)
            .map_err(|e| UpstreamError::InvalidRequest(format!("batch encode failed: {e}")))?;

        let start = Instant::now();
        let result = self.http.send_request(&endpoint.url, body.into(), endpoint.timeout).await;
        metrics::record_upstream_batch(&endpoint.name, start.elapsed());

        let body = result.inspect_err(|e| {
            metrics::record_upstream_error(&endpoint.name, e.kind());
        })?;

        let mut response = Self::parse_body(&body).inspect_err(|e| {
            metrics::record_upstream_error(&endpoint.name, e.kind());
        })?;
        response.retain_requested(&requested);

        if response.is_empty() {
            metrics::record_upstream_error(&endpoint.name, "invalid_response");
            return Err(UpstreamError::InvalidResponse(
                "no entries matched the batch".to_string(),
            ));
        }

        for (id, error) in response.errors() {
            let category = RpcErrorCategory::from_code_and_message(error.code, &error.message);
            metrics::record_rpc_entry_error(&endpoint.name, category);
            if category.is_transient() {
                warn!(source = %endpoint.name, id, code = error.code, category = category.as_str(), "batch entry failed");
            } else {
                debug!(source = %endpoint.name, id, code = error.code, category = category.as_str(), "batch entry failed");
            }
        }

        debug!(
            source = %endpoint.name,
            requested = requested.len(),
            answered = response.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch completed"
        );

        Ok(response)
    }
}

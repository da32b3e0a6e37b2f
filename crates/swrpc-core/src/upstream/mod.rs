//! Upstream node access.
//!
//! - [`registry`]: source identifier → endpoint resolution. Unknown sources fail here, before
//!   any network call.
//! - [`http_client`]: pooled `reqwest` client with a concurrency semaphore, one attempt per
//!   call, sanitized error messages.
//! - [`batch`]: the [`BatchTransport`] seam and its HTTP implementation. One POST carries
//!   every sub-request; results are matched back by correlation id.
//!
//! # Failure Model
//!
//! ```text
//! non-2xx / timeout / malformed envelope ──► UpstreamError (whole batch)
//! {"id": n, "error": {...}} inside array  ──► per-id Err, other ids unaffected
//! ```

pub mod batch;
pub mod errors;
pub mod http_client;
pub mod registry;

pub use batch::{BatchResponse, BatchTransport, HttpBatchClient};
pub use errors::{RpcErrorCategory, UpstreamError};
pub use http_client::{HttpClient, HttpClientConfig};
pub use registry::{Endpoint, RegistryError, SourceRegistry};

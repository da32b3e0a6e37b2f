//! Integration tests for swrpc.
//!
//! - `mock_infrastructure`: mockito-backed JSON-RPC upstream, a hanging TCP upstream and
//!   runtime fixtures
//! - `batch_client_tests`: `HttpBatchClient` against a real HTTP server
//! - `swr_scenario_tests`: fresh / stale / miss / fallback sequences end to end
//! - `persistence_tests`: resolved values reaching the JSON file, SQLite and log sinks
//! - `runtime_tests`: builder validation and shutdown
//! - `server_tests`: the HTTP router over a mocked upstream
//!
//! ```bash
//! cargo test --package tests
//! ```

pub mod mock_infrastructure;

#[cfg(test)]
mod batch_client_tests;
#[cfg(test)]
mod persistence_tests;
#[cfg(test)]
mod runtime_tests;
#[cfg(test)]
mod server_tests;

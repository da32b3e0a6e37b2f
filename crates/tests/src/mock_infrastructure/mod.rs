//! Mock infrastructure for exercising swrpc against real sockets.
//!
//! - `RpcMockBuilder`: wraps mockito to answer batched JSON-RPC requests
//! - `HangingUpstream`: accepts connections and never answers, for timeout paths
//! - Fixtures for endpoints, clocks and runtimes
//!
//! ```ignore
//! use tests::mock_infrastructure::RpcMockBuilder;
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_snapshot_batch("0x64", "0x3b9aca00", "0x10");
//! let endpoint = tests::mock_infrastructure::endpoint("ethereum", &mock.url());
//! ```

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;

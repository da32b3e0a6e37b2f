//! Batched JSON-RPC upstream on top of mockito.
//!
//! Responses are arrays of entries, deliberately not in request order, so callers must
//! correlate by id.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Correlation ids of the snapshot batch: `eth_call`, `eth_gasPrice`, `eth_blockNumber`.
pub const BALANCE_ID: u64 = 1;
pub const GAS_PRICE_ID: u64 = 2;
pub const BLOCK_NUMBER_ID: u64 = 3;

/// Builder for mock upstream responses.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl RpcMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    fn snapshot_matcher() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::Regex(r#""method"\s*:\s*"eth_call""#.to_string()),
            Matcher::Regex(r#""method"\s*:\s*"eth_gasPrice""#.to_string()),
            Matcher::Regex(r#""method"\s*:\s*"eth_blockNumber""#.to_string()),
        ])
    }

    fn batch_mock(&mut self, matcher: Matcher, entries: &[Value], hits: Option<usize>) -> &mut Self {
        let mut mock = self
            .server
            .mock("POST", "/")
            .match_body(matcher)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Value::Array(entries.to_vec()).to_string());

        if let Some(hits) = hits {
            mock = mock.expect(hits);
        }

        self.mocks.push(mock.create());
        self
    }

    /// Answers the snapshot batch with the three quantities, in reverse id order.
    pub fn mock_snapshot_batch(&mut self, balance: &str, gas_price: &str, block: &str) -> &mut Self {
        let entries = snapshot_entries(balance, gas_price, block);
        self.batch_mock(Self::snapshot_matcher(), &entries, None)
    }

    /// Like [`Self::mock_snapshot_batch`] but asserts the exact number of upstream calls
    /// in [`Self::assert_hits`].
    pub fn expect_snapshot_batch(
        &mut self,
        hits: usize,
        balance: &str,
        gas_price: &str,
        block: &str,
    ) -> &mut Self {
        let entries = snapshot_entries(balance, gas_price, block);
        self.batch_mock(Self::snapshot_matcher(), &entries, Some(hits))
    }

    /// Answers the snapshot batch with arbitrary entries.
    pub fn mock_snapshot_entries(&mut self, entries: &[Value]) -> &mut Self {
        self.batch_mock(Self::snapshot_matcher(), entries, None)
    }

    /// Answers `eth_getLogs` batches with `logs`.
    pub fn mock_get_logs(&mut self, logs: &[Value]) -> &mut Self {
        let entry = json!({ "jsonrpc": "2.0", "id": 1, "result": logs });
        self.batch_mock(
            Matcher::Regex(r#""method"\s*:\s*"eth_getLogs""#.to_string()),
            std::slice::from_ref(&entry),
            None,
        )
    }

    /// Rejects any batch with a single envelope-level error object.
    pub fn mock_envelope_error(&mut self, code: i32, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": code, "message": message }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_server_error(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(500)
            .with_body("Internal Server Error")
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_malformed_body(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{not json")
            .create();

        self.mocks.push(mock);
        self
    }

    /// Drops every mock so the next ones start from a clean server.
    pub async fn reset(&mut self) {
        self.mocks.clear();
        self.server.reset_async().await;
    }

    /// Panics unless every mock saw its expected number of requests.
    pub async fn assert_hits(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }

    #[must_use]
    pub fn all_mocks_matched(&self) -> bool {
        self.mocks.iter().all(Mock::matched)
    }

    pub fn server(&mut self) -> &mut ServerGuard {
        &mut self.server
    }
}

/// Snapshot batch entries, returned out of order.
#[must_use]
pub fn snapshot_entries(balance: &str, gas_price: &str, block: &str) -> Vec<Value> {
    vec![
        result_entry(BLOCK_NUMBER_ID, json!(block)),
        result_entry(BALANCE_ID, json!(balance)),
        result_entry(GAS_PRICE_ID, json!(gas_price)),
    ]
}

#[must_use]
pub fn result_entry(id: u64, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

#[must_use]
pub fn error_entry(id: u64, code: i32, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

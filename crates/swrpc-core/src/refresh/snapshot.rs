//! The contract snapshot value and its batch.

use crate::{
    cache::CacheEntry,
    types::JsonRpcRequest,
    upstream::BatchResponse,
    utils::quantity::{decimal_string, format_scaled, quantity_or_zero},
};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// `keccak256("balanceOf(address)")[..4]`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Gas price is rendered in gwei: `wei / 10^9`.
pub const GWEI_DECIMALS: u32 = 9;

const PRICE_PRECISION: u32 = 3;

pub const BALANCE_ID: u64 = 1;
pub const GAS_PRICE_ID: u64 = 2;
pub const BLOCK_NUMBER_ID: u64 = 3;

/// Aggregated on-chain state for one contract on one chain.
///
/// Serialized as the cache payload and returned to callers. `balance` is
/// `balanceOf(0x0…0)` on the contract, a `uint256` carried as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    #[serde(with = "decimal_string")]
    pub balance: BigUint,
    /// Gas price, e.g. `"25.500 Gwei"`.
    pub current_price: String,
    pub chain: String,
    pub block_number: u64,
}

impl ContractSnapshot {
    /// Assembles a snapshot from a batch answer.
    ///
    /// Missing entries, per-id errors and unparsable quantities decode to zero. A block
    /// number wider than 64 bits also decodes to zero.
    #[must_use]
    pub fn from_batch(chain: &str, response: &BatchResponse) -> Self {
        let balance = quantity_or_zero(response.result(BALANCE_ID));
        let gas_price = quantity_or_zero(response.result(GAS_PRICE_ID));
        let block_number = quantity_or_zero(response.result(BLOCK_NUMBER_ID)).to_u64().unwrap_or(0);

        Self {
            balance,
            current_price: render_gwei(&gas_price),
            chain: chain.to_string(),
            block_number,
        }
    }

    /// Decodes a stored entry. `None` if the payload is not a snapshot.
    #[must_use]
    pub fn from_entry(entry: &CacheEntry) -> Option<Self> {
        serde_json::from_str(&entry.payload).ok()
    }
}

/// Renders a wei amount as gwei with three decimals.
#[must_use]
pub fn render_gwei(wei: &BigUint) -> String {
    format!("{} Gwei", format_scaled(wei, GWEI_DECIMALS, PRICE_PRECISION))
}

/// The three independent reads answering one snapshot, sent as a single batch.
#[must_use]
pub fn snapshot_batch(contract: &str) -> Vec<JsonRpcRequest> {
    vec![
        JsonRpcRequest::new(
            BALANCE_ID,
            "eth_call",
            json!([{ "to": contract, "data": balance_of_zero_calldata() }, "latest"]),
        ),
        JsonRpcRequest::new(GAS_PRICE_ID, "eth_gasPrice", json!([])),
        JsonRpcRequest::new(BLOCK_NUMBER_ID, "eth_blockNumber", json!([])),
    ]
}

/// ABI calldata for `balanceOf(address(0))`: selector plus one zero 32-byte word.
fn balance_of_zero_calldata() -> String {
    format!("0x{}{}", hex::encode(BALANCE_OF_SELECTOR), hex::encode([0u8; 32]))
}

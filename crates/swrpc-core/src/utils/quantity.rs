//! JSON-RPC quantity decoding and rendering.
//!
//! Upstream integers arrive as big-endian hex strings of arbitrary width (`uint256` balances
//! do not fit any primitive). Decoding never fails the caller: [`quantity_or_zero`] maps an
//! absent or malformed value to zero, the neutral default used by the refresh path.

use num_bigint::BigUint;
use num_traits::Zero;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("invalid hex quantity: {0}")]
    InvalidHex(String),
}

/// Parses a hex quantity with optional `0x`/`0X` prefix.
///
/// An empty digit string (`"0x"`, returned by `eth_call` against an address without code)
/// decodes to zero.
///
/// # Examples
/// ```
/// use num_bigint::BigUint;
/// use swrpc_core::utils::parse_quantity;
///
/// assert_eq!(parse_quantity("0x64").unwrap(), BigUint::from(100u32));
/// assert_eq!(parse_quantity("0x").unwrap(), BigUint::from(0u32));
/// assert!(parse_quantity("0xzz").is_err());
/// ```
///
/// # Errors
/// Returns [`QuantityError::InvalidHex`] if any digit is not hexadecimal.
pub fn parse_quantity(raw: &str) -> Result<BigUint, QuantityError> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);

    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QuantityError::InvalidHex(raw.to_string()));
    }

    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| QuantityError::InvalidHex(raw.to_string()))
}

/// Decodes a JSON result as a hex quantity, defaulting to zero.
///
/// `None`, JSON `null`, non-string values and unparsable strings all yield zero.
#[must_use]
pub fn quantity_or_zero(value: Option<&Value>) -> BigUint {
    value
        .and_then(Value::as_str)
        .and_then(|raw| parse_quantity(raw).ok())
        .unwrap_or_else(BigUint::zero)
}

/// Renders `value / 10^decimals` with exactly `precision` fractional digits.
///
/// Uses integer arithmetic end to end and rounds half up, so the output does not depend on
/// floating point width.
///
/// # Examples
/// ```
/// use swrpc_core::utils::format_scaled;
///
/// assert_eq!(format_scaled(&1_000_000_000u64.into(), 9, 3), "1.000");
/// assert_eq!(format_scaled(&1_234_567_890u64.into(), 9, 3), "1.235");
/// ```
#[must_use]
pub fn format_scaled(value: &BigUint, decimals: u32, precision: u32) -> String {
    let scale = BigUint::from(10u32).pow(decimals);
    let fraction_scale = BigUint::from(10u32).pow(precision);

    let half = &scale / 2u32;
    let rounded = (value * &fraction_scale + half) / &scale;

    let integer = &rounded / &fraction_scale;
    if precision == 0 {
        return integer.to_string();
    }

    let fraction = (&rounded % &fraction_scale).to_string();
    let padding = (precision as usize).saturating_sub(fraction.len());
    format!("{integer}.{}{fraction}", "0".repeat(padding))
}

/// Formats a block number as a JSON-RPC quantity (`0x0` for zero).
#[must_use]
pub fn format_quantity_u64(value: u64) -> String {
    format!("{value:#x}")
}

/// Serde adapter storing a [`BigUint`] as a base-10 string.
///
/// JSON numbers cannot carry 256-bit integers portably, so balances travel as strings.
pub mod decimal_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// # Errors
    /// Fails if the string is not a non-negative base-10 integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(de::Error::custom(format!("invalid decimal integer: {raw}")));
        }
        raw.parse::<BigUint>().map_err(de::Error::custom)
    }
}

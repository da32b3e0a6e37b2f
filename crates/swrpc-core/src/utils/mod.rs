//! Small shared utilities.
//!
//! - [`clock`]: Injectable wall clock so freshness and expiry can be driven in tests.
//! - [`quantity`]: Hex quantity decoding and scaled decimal rendering for JSON-RPC results.

pub mod clock;
pub mod quantity;

pub use clock::{to_time_delta, Clock, ManualClock, SystemClock};
pub use quantity::{
    format_quantity_u64, format_scaled, parse_quantity, quantity_or_zero, QuantityError,
};

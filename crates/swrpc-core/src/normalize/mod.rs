//! Subject normalization.
//!
//! Every cache operation runs on a normalized key, so two spellings of the same contract
//! address share one entry. The default normalizer produces the EIP-55 mixed-case checksum
//! form.

use crate::cache::CacheKey;
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid address: {0}")]
    Malformed(String),
    #[error("invalid address checksum: {0}")]
    BadChecksum(String),
}

/// Canonicalizes raw subjects into cache keys.
///
/// Implementations must be deterministic and idempotent: normalizing an already normalized
/// subject returns it unchanged.
pub trait KeyNormalizer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if `raw` is not a valid subject.
    fn normalize_subject(&self, raw: &str) -> Result<String, NormalizeError>;

    /// Normalizes `raw` and pairs it with an already resolved source name.
    ///
    /// # Errors
    ///
    /// Propagates [`KeyNormalizer::normalize_subject`] failures.
    fn normalize(&self, raw: &str, source: &str) -> Result<CacheKey, NormalizeError> {
        Ok(CacheKey::new(source, self.normalize_subject(raw)?))
    }
}

/// EIP-55 checksum normalizer for 20-byte addresses.
///
/// Accepts surrounding whitespace, `0x` or `0X`, and all-lower or all-upper hex. Mixed-case
/// input is taken as a checksum claim and must verify.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumNormalizer;

impl KeyNormalizer for ChecksumNormalizer {
    fn normalize_subject(&self, raw: &str) -> Result<String, NormalizeError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| NormalizeError::Malformed(trimmed.to_string()))?;

        if digits.len() != 40 {
            return Err(NormalizeError::Malformed(trimmed.to_string()));
        }
        let bytes =
            hex::decode(digits).map_err(|_| NormalizeError::Malformed(trimmed.to_string()))?;

        let checksummed = to_checksum(&bytes);

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && &checksummed[2..] != digits {
            return Err(NormalizeError::BadChecksum(trimmed.to_string()));
        }

        Ok(checksummed)
    }
}

fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Renders address bytes in EIP-55 form: a hex letter is upper-cased when the matching nibble
/// of `keccak256(lowercase_hex)` is 8 or more.
fn to_checksum(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

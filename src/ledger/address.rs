//! Account and contract addresses

use alloy_primitives::hex;
use std::str::FromStr;

pub use alloy_primitives::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x: '{0}'")]
    MissingPrefix(String),
    #[error("address '{raw}' is invalid: {reason}")]
    Invalid { raw: String, reason: String },
    #[error("address checksum mismatch: '{0}'")]
    BadChecksum(String),
}

/// Parse a `0x`-prefixed address.
///
/// All-lowercase and all-uppercase input carries no checksum; mixed case must
/// be valid EIP-55.
pub fn parse_address(raw: &str) -> Result<Address, AddressError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AddressError::MissingPrefix(trimmed.to_string()))?;

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{}", digits), None).map_err(|e| match e {
            alloy_primitives::AddressError::InvalidChecksum => {
                AddressError::BadChecksum(trimmed.to_string())
            }
            other => AddressError::Invalid {
                raw: trimmed.to_string(),
                reason: other.to_string(),
            },
        });
    }

    Address::from_str(digits).map_err(|e| AddressError::Invalid {
        raw: trimmed.to_string(),
        reason: e.to_string(),
    })
}

/// Lowercase `0x`-prefixed form used in JSON-RPC payloads
pub fn to_wire(address: &Address) -> String {
    hex::encode_prefixed(address.as_slice())
}

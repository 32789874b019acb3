//! Bech32 account and operator addresses.
//!
//! Addresses are 20-byte payloads rendered as Bech32 strings. Account
//! addresses (builders, proposers, module accounts) use the `auc` prefix;
//! validator operator addresses use `aucval`. The payload is derived from
//! the first 20 bytes of the SHA-256 digest of the public key encoding, so
//! a pubkey always maps to exactly one address under each prefix.

use bech32::{Bech32, Hrp};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length in bytes of an address payload.
pub const ADDRESS_LEN: usize = 20;

/// Human-readable prefix for account addresses.
pub const ACCOUNT_HRP: &str = "auc";

/// Human-readable prefix for validator operator addresses.
pub const OPERATOR_HRP: &str = "aucval";

/// Errors produced when parsing or deriving addresses.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid bech32 encoding: {0}")]
    Encoding(String),
    #[error("invalid address prefix: want {want:?}, have {have:?}")]
    Prefix { want: &'static str, have: String },
    #[error("invalid address payload length: {0}")]
    PayloadLength(usize),
}

fn derive_payload(pubkey_bytes: &[u8]) -> [u8; ADDRESS_LEN] {
    let digest = Sha256::digest(pubkey_bytes);
    let mut payload = [0u8; ADDRESS_LEN];
    payload.copy_from_slice(&digest[..ADDRESS_LEN]);
    payload
}

fn encode(hrp: &'static str, payload: &[u8]) -> String {
    // The prefixes are fixed literals and the payload length is fixed, so
    // encoding cannot fail at runtime.
    let hrp = Hrp::parse(hrp).expect("hard-coded address prefix should parse");
    bech32::encode::<Bech32>(hrp, payload).expect("bech32 encoding of 20-byte payload")
}

/// Renders the account address for the given public key encoding.
pub fn account_address(pubkey_bytes: &[u8]) -> String {
    encode(ACCOUNT_HRP, &derive_payload(pubkey_bytes))
}

/// Renders the validator operator address for the given public key encoding.
pub fn operator_address(pubkey_bytes: &[u8]) -> String {
    encode(OPERATOR_HRP, &derive_payload(pubkey_bytes))
}

/// Derives the module account address for a named module.
///
/// Module accounts have no public key; their payload is derived from the
/// module name so that it is stable across nodes and restarts.
pub fn module_address(module_name: &str) -> String {
    let mut input = Vec::with_capacity(7 + module_name.len());
    input.extend_from_slice(b"module/");
    input.extend_from_slice(module_name.as_bytes());
    encode(ACCOUNT_HRP, &derive_payload(&input))
}

fn decode(expected_hrp: &'static str, addr: &str) -> Result<[u8; ADDRESS_LEN], AddressError> {
    let (hrp, payload) = bech32::decode(addr).map_err(|e| AddressError::Encoding(e.to_string()))?;
    if hrp.as_str() != expected_hrp {
        return Err(AddressError::Prefix {
            want: expected_hrp,
            have: hrp.as_str().to_string(),
        });
    }
    if payload.len() != ADDRESS_LEN {
        return Err(AddressError::PayloadLength(payload.len()));
    }
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&payload);
    Ok(out)
}

/// Checks that `addr` is a well-formed account address.
pub fn validate_account_address(addr: &str) -> Result<(), AddressError> {
    decode(ACCOUNT_HRP, addr).map(|_| ())
}

/// Checks that `addr` is a well-formed validator operator address.
pub fn validate_operator_address(addr: &str) -> Result<(), AddressError> {
    decode(OPERATOR_HRP, addr).map(|_| ())
}

/// Re-renders a validator operator address as the account address owned by
/// the same key. Used to determine the expected signer of messages that are
/// authorized by an operator.
pub fn operator_to_account(operator_addr: &str) -> Result<String, AddressError> {
    let payload = decode(OPERATOR_HRP, operator_addr)?;
    Ok(encode(ACCOUNT_HRP, &payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_address_roundtrips() {
        let addr = account_address(b"some pubkey bytes");
        assert!(addr.starts_with(ACCOUNT_HRP));
        validate_account_address(&addr).expect("derived address should validate");
    }

    #[test]
    fn operator_address_uses_distinct_prefix() {
        let acc = account_address(b"key");
        let op = operator_address(b"key");
        assert_ne!(acc, op);
        assert!(op.starts_with(OPERATOR_HRP));
        validate_operator_address(&op).expect("derived operator address should validate");
        assert!(validate_account_address(&op).is_err());
    }

    #[test]
    fn operator_to_account_preserves_payload() {
        let op = operator_address(b"key");
        let acc = operator_to_account(&op).expect("conversion should succeed");
        assert_eq!(acc, account_address(b"key"));
    }

    #[test]
    fn module_address_is_stable() {
        assert_eq!(module_address("auction"), module_address("auction"));
        assert_ne!(module_address("auction"), module_address("distribution"));
    }

    #[test]
    fn garbage_addresses_are_rejected() {
        assert!(validate_account_address("not-an-address").is_err());
        assert!(validate_account_address("").is_err());
    }
}

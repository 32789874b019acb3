//! Module-level error type for on-chain message handling.

use thiserror::Error;

use super::coin::CoinError;
use super::commitment::CommitmentError;
use super::params::ParamsError;

/// Errors returned by message handlers and state mutations.
///
/// Inside a block these abort the offending message but never the block;
/// the variants mirror the failure classes the protocol distinguishes.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Malformed or semantically invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// An update targeted a key that was never set.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// The message was signed by the wrong party.
    #[error("invalid signer: {0}")]
    InvalidSigner(String),
    /// An address does not match the public key it claims to come from.
    #[error("address doesn't match pubkey: have {have:?}, want {want:?}")]
    AddressPubKeyMismatch { have: String, want: String },
    /// A signature failed verification.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Codec or store corruption; not caused by the caller.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<ParamsError> for ModuleError {
    fn from(e: ParamsError) -> Self {
        ModuleError::InvalidRequest(format!("invalid params: {e}"))
    }
}

impl From<CoinError> for ModuleError {
    fn from(e: CoinError) -> Self {
        ModuleError::InvalidRequest(format!("invalid coin: {e}"))
    }
}

impl From<CommitmentError> for ModuleError {
    fn from(e: CommitmentError) -> Self {
        ModuleError::InvalidSignature(e.to_string())
    }
}

//! Core domain types used by the auction chain.
//!
//! This module defines the strongly-typed building blocks that are shared
//! across the chain implementation:
//!
//! - SHA-256 hashing helpers used for block regions and transaction identity,
//! - Bech32 account and operator addresses (`address`),
//! - normalized coin literals (`coin`),
//! - signing keys and public keys (`keys`),
//! - the canonical off-chain wire types (`wire`),
//! - the doubly-signed segment commitment (`commitment`),
//! - registered builder / proposer records (`registry`),
//! - module parameters (`params`),
//! - on-chain messages (`msgs`) and the transaction envelope (`tx`),
//! - block-proposal request/response shapes (`proposal`).
//!
//! The goal is to avoid "naked" byte buffers and strings in public APIs and
//! instead use domain-specific types with canonical encodings.

use sha2::{Digest, Sha256};

pub mod address;
pub mod coin;
pub mod commitment;
mod encoding;
pub mod error;
pub mod keys;
pub mod msgs;
pub mod params;
pub mod proposal;
pub mod registry;
pub mod tx;
pub mod wire;

pub use coin::{parse_coin_normalized, Coin, CoinError, BASE_DENOM};
pub use commitment::SegmentCommitment;
pub use error::ModuleError;
pub use keys::{Key, KeyError, PrivKey, PubKey, Signer};
pub use msgs::{
    Msg, MsgCommitSegment, MsgEditBuilder, MsgRegisterBuilder, MsgRegisterProposer,
    MsgReportProposer, MsgUpdateParams,
};
pub use params::Params;
pub use proposal::{
    Context, PrepareProposalRequest, PrepareProposalResponse, ProcessProposalRequest,
    ProcessProposalResponse, ProposalStatus,
};
pub use registry::{Builder, Proposer};
pub use tx::{AuthInfo, Tx, TxBody, TxError};
pub use wire::{BidRequest, BidResponse, CommitRequest, CommitResponse};

/// Length in bytes of all SHA-256 hashes used by the chain.
pub const HASH_LEN: usize = 32;

/// Name of the auction module, used to derive its module account address.
pub const MODULE_NAME: &str = "auction";

/// Computes `SHA256(v1 ∥ v2 ∥ … ∥ vn)` over the given byte slices.
///
/// This is the hash used for block prefix and segment regions as well as
/// for commitment signature identity. All inputs here are length-delimited
/// transactions, so concatenation boundaries carry no meaning.
pub fn hash_byte_slices<T: AsRef<[u8]>>(parts: &[T]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hasher.finalize().to_vec()
}

/// Computes the SHA-256 digest of a single byte slice as a fixed array.
///
/// Used for raw transaction identity (deduplication, inclusion lookups).
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_byte_slices_matches_concatenation() {
        let a = b"hello ".to_vec();
        let b = b"world".to_vec();

        let split = hash_byte_slices(&[a.clone(), b.clone()]);
        let joined = hash_byte_slices(&[b"hello world".to_vec()]);

        assert_eq!(split, joined);
        assert_eq!(split.len(), HASH_LEN);
    }

    #[test]
    fn hash_of_no_slices_is_hash_of_empty_input() {
        let none: Vec<Vec<u8>> = Vec::new();
        assert_eq!(hash_byte_slices(&none), sha256(b"").to_vec());
    }
}

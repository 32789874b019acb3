//! The doubly-signed segment commitment.
//!
//! A [`SegmentCommitment`] binds a proposer and a builder to a specific
//! placement of the builder's segment inside a block: the prefix region,
//! the segment region, their hashes, and the promised payment. Both parties
//! sign the same canonical encoding; the pair of signatures is the
//! commitment's identity in state.
//!
//! If the proposer commits but the commitment transaction never lands in
//! the block, the builder holds both signatures and can submit the
//! commitment as evidence via `MsgReportProposer`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding::{base64_bytes, int_as_string};
use super::keys::{KeyError, PubKey, Signer};
use super::wire::CommitRequest;
use super::{hash_byte_slices, HASH_LEN};

/// Errors produced when checking a commitment against block contents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("invalid builder signature")]
    BuilderSignature,
    #[error("invalid proposer signature")]
    ProposerSignature,
    #[error("{region} range [{offset}, {offset}+{length}) out of bounds for {len} txs")]
    RangeOutOfBounds {
        region: &'static str,
        offset: i32,
        length: i32,
        len: usize,
    },
    #[error("invalid prefix hash")]
    PrefixHash,
    #[error("invalid segment hash")]
    SegmentHash,
}

/// The commitment binding proposer and builder to a block segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentCommitment {
    pub proposer_address: String,
    pub builder_address: String,
    pub chain_id: String,
    #[serde(with = "int_as_string")]
    pub height: i64,
    #[serde(default)]
    pub preference_ids: Vec<String>,
    pub prefix_offset: i32,
    pub prefix_length: i32,
    #[serde(default, with = "base64_bytes")]
    pub prefix_hash: Vec<u8>,
    pub segment_offset: i32,
    pub segment_length: i32,
    pub segment_bytes: i64,
    pub segment_gas: i64,
    #[serde(default, with = "base64_bytes")]
    pub segment_hash: Vec<u8>,
    pub payment_promise: String,

    // Unlike the request/response types, the signatures are always
    // serialized (as "" when unset): commitments are also stored under the
    // canonical binary codec, which cannot re-discover skipped fields.
    // Sign bytes never include them; see `get_sign_bytes`.
    #[serde(default, with = "base64_bytes")]
    pub proposer_signature: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub builder_signature: Vec<u8>,
}

impl SegmentCommitment {
    /// The commitment's primary identity in state:
    /// `SHA256(proposer_signature ∥ builder_signature)`.
    pub fn signatures_hash(&self) -> Vec<u8> {
        hash_byte_slices(&[&self.proposer_signature, &self.builder_signature])
    }

    /// Canonical bytes both parties sign over (signatures excluded).
    ///
    /// The unsigned form of a commitment is exactly the commit request it
    /// answers: the proposer signs the request, the builder adopts that
    /// signature as the commitment's proposer signature, and both parties
    /// end up signing identical bytes.
    pub fn get_sign_bytes(&self) -> Vec<u8> {
        let req = CommitRequest {
            proposer_address: self.proposer_address.clone(),
            builder_address: self.builder_address.clone(),
            chain_id: self.chain_id.clone(),
            height: self.height,
            preference_ids: self.preference_ids.clone(),
            prefix_offset: self.prefix_offset,
            prefix_length: self.prefix_length,
            prefix_hash: self.prefix_hash.clone(),
            segment_offset: self.segment_offset,
            segment_length: self.segment_length,
            segment_bytes: self.segment_bytes,
            segment_gas: self.segment_gas,
            segment_hash: self.segment_hash.clone(),
            payment_promise: self.payment_promise.clone(),
            signature: Vec::new(),
        };
        req.get_sign_bytes()
    }

    /// Attaches the builder's counter-signature.
    pub fn sign_as_builder(&mut self, signer: &dyn Signer) -> Result<(), KeyError> {
        self.builder_signature = signer.sign(&self.get_sign_bytes())?;
        Ok(())
    }

    /// Verifies both signatures against the registered public keys.
    pub fn verify_signatures(
        &self,
        builder_pubkey: &PubKey,
        proposer_pubkey: &PubKey,
    ) -> Result<(), CommitmentError> {
        let sign_bytes = self.get_sign_bytes();

        if !builder_pubkey.verify(&sign_bytes, &self.builder_signature) {
            return Err(CommitmentError::BuilderSignature);
        }
        if !proposer_pubkey.verify(&sign_bytes, &self.proposer_signature) {
            return Err(CommitmentError::ProposerSignature);
        }

        Ok(())
    }

    /// Checks the prefix and segment hashes against a block's transactions.
    ///
    /// The commitment's offsets and lengths select two adjacent regions of
    /// `txs`; each region's concatenation hash must match the committed one.
    pub fn verify_block_hashes(&self, txs: &[Vec<u8>]) -> Result<(), CommitmentError> {
        let prefix = region(txs, "prefix", self.prefix_offset, self.prefix_length)?;
        if self.prefix_hash != hash_byte_slices(prefix) {
            return Err(CommitmentError::PrefixHash);
        }

        let segment = region(txs, "segment", self.segment_offset, self.segment_length)?;
        if self.segment_hash != hash_byte_slices(segment) {
            return Err(CommitmentError::SegmentHash);
        }

        Ok(())
    }
}

fn region<'a>(
    txs: &'a [Vec<u8>],
    name: &'static str,
    offset: i32,
    length: i32,
) -> Result<&'a [Vec<u8>], CommitmentError> {
    let out_of_bounds = || CommitmentError::RangeOutOfBounds {
        region: name,
        offset,
        length,
        len: txs.len(),
    };

    if offset < 0 || length < 0 {
        return Err(out_of_bounds());
    }

    let start = offset as usize;
    let end = start.checked_add(length as usize).ok_or_else(out_of_bounds)?;
    txs.get(start..end).ok_or_else(out_of_bounds)
}

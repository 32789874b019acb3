//! Off-chain wire types exchanged between proposers and builders.
//!
//! Four JSON messages make up the auction protocol:
//!
//! - [`BidRequest`]: proposer → builder, soliciting a sealed bid,
//! - [`BidResponse`]: builder → proposer, the sealed bid,
//! - [`CommitRequest`]: proposer → winning builder, committing to the bid,
//! - [`CommitResponse`]: builder → proposer, segment transactions plus the
//!   counter-signed commitment transaction.
//!
//! Each carries a detached signature over the canonical encoding described
//! in the `encoding` module. Fields that are empty strings or zero integers
//! in optional positions are omitted from the encoding, matching the
//! canonical form exactly; lists and hash fields always appear, normalized
//! to `[]` or `""` when unset.

use serde::{Deserialize, Serialize};

use super::encoding::{self, base64_bytes, base64_list, int_as_string, is_zero};
use super::keys::{KeyError, PubKey, Signer};

fn is_empty_string(s: &str) -> bool {
    s.is_empty()
}

/// Proposer's signed solicitation for bids on one block height.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BidRequest {
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub proposer_address: String,
    pub chain_id: String,
    #[serde(with = "int_as_string")]
    pub height: i64,
    pub payment_denom: String,
    #[serde(default)]
    pub preference_ids: Vec<String>,
    #[serde(default, with = "base64_list")]
    pub prefix_transactions: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_bytes: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_gas: i64,

    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

/// Builder's sealed bid for one block height.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BidResponse {
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub proposer_address: String,
    pub chain_id: String,
    #[serde(with = "int_as_string")]
    pub height: i64,
    #[serde(default)]
    pub preference_ids: Vec<String>,
    #[serde(default, with = "base64_bytes")]
    pub prefix_hash: Vec<u8>,
    pub payment_promise: String,
    pub segment_length: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment_bytes: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment_gas: i64,
    #[serde(default, with = "base64_bytes")]
    pub segment_hash: Vec<u8>,

    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

/// Proposer's signed commitment to the winning bid's placement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommitRequest {
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub proposer_address: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
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
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment_bytes: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment_gas: i64,
    #[serde(default, with = "base64_bytes")]
    pub segment_hash: Vec<u8>,
    pub payment_promise: String,

    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

/// Builder's signed response to a commitment: the segment itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommitResponse {
    pub chain_id: String,
    #[serde(with = "int_as_string")]
    pub height: i64,
    #[serde(default, with = "base64_list")]
    pub segment_transactions: Vec<Vec<u8>>,
    #[serde(default, with = "base64_bytes")]
    pub segment_commitment_transaction: Vec<u8>,

    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

macro_rules! impl_signed_wire_type {
    ($type:ty) => {
        impl $type {
            /// Canonical bytes this message is signed over.
            pub fn get_sign_bytes(&self) -> Vec<u8> {
                let mut cp = self.clone();
                cp.signature = Vec::new();
                encoding::sign_bytes(&cp)
            }

            /// Signs the message in place.
            pub fn sign_with(&mut self, signer: &dyn Signer) -> Result<(), KeyError> {
                self.signature = signer.sign(&self.get_sign_bytes())?;
                Ok(())
            }

            /// Verifies the detached signature against `pubkey`.
            pub fn verify_signature(&self, pubkey: &PubKey) -> bool {
                pubkey.verify(&self.get_sign_bytes(), &self.signature)
            }
        }
    };
}

impl_signed_wire_type!(BidRequest);
impl_signed_wire_type!(BidResponse);
impl_signed_wire_type!(CommitRequest);
impl_signed_wire_type!(CommitResponse);

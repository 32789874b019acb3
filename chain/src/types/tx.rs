//! Transaction envelope and canonical encoding.
//!
//! On-chain transactions wrap a body (messages + memo) and auth info (the
//! signer's public key, account number, sequence, gas limit, and fee) with
//! a single detached signature.
//!
//! Serialization is done with **bincode 2** using the `serde` integration
//! (`bincode::serde::encode_to_vec`) and an explicit `standard()` config.
//! The same canonical encoding is used for hashing, signing, and the block
//! transaction lists, so a transaction's bytes are stable everywhere.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::coin::Coin;
use super::keys::{Key, KeyError, PubKey};
use super::msgs::{Msg, MsgCommitSegment};
use super::{sha256, HASH_LEN};

/// Errors produced when building, encoding, or checking transactions.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("decode transaction: {0}")]
    Decode(String),
    #[error("encode transaction: {0}")]
    Encode(String),
    #[error("sign transaction: {0}")]
    Sign(#[from] KeyError),
    #[error("transaction has no messages")]
    NoMessages,
}

/// What a transaction does: an ordered list of messages plus a free memo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    pub memo: String,
}

/// Who authorizes a transaction and what they pay for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub pubkey: PubKey,
    pub account_number: u64,
    pub sequence: u64,
    pub gas_limit: u64,
    pub fee: Vec<Coin>,
}

/// A signed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    pub signature: Vec<u8>,
}

/// The document covered by a transaction signature.
///
/// Binding the chain ID prevents replay across chains; the account number
/// and sequence inside `auth_info` prevent replay within one chain.
#[derive(Serialize)]
struct SignDoc<'a> {
    chain_id: &'a str,
    body: &'a TxBody,
    auth_info: &'a AuthInfo,
}

fn sign_doc_bytes(chain_id: &str, body: &TxBody, auth_info: &AuthInfo) -> Result<Vec<u8>, TxError> {
    let doc = SignDoc {
        chain_id,
        body,
        auth_info,
    };
    bincode::serde::encode_to_vec(&doc, bincode::config::standard())
        .map_err(|e| TxError::Encode(e.to_string()))
}

impl Tx {
    /// Builds and signs a transaction with a single signer.
    pub fn sign(
        key: &Key,
        chain_id: &str,
        body: TxBody,
        account_number: u64,
        sequence: u64,
        gas_limit: u64,
        fee: Vec<Coin>,
    ) -> Result<Self, TxError> {
        if body.messages.is_empty() {
            return Err(TxError::NoMessages);
        }

        let auth_info = AuthInfo {
            pubkey: key.pub_key.clone(),
            account_number,
            sequence,
            gas_limit,
            fee,
        };

        let doc = sign_doc_bytes(chain_id, &body, &auth_info)?;
        let signature = key.priv_key.sign(&doc)?;

        Ok(Self {
            body,
            auth_info,
            signature,
        })
    }

    /// Verifies the signature against the embedded public key.
    pub fn verify_signature(&self, chain_id: &str) -> bool {
        match sign_doc_bytes(chain_id, &self.body, &self.auth_info) {
            Ok(doc) => self.auth_info.pubkey.verify(&doc, &self.signature),
            Err(_) => false,
        }
    }

    /// Canonical byte representation of this transaction.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TxError::Encode(e.to_string()))
    }

    /// Decodes a transaction from its canonical bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, TxError> {
        let (tx, read): (Tx, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| TxError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(TxError::Decode(format!(
                "trailing garbage: {} of {} bytes consumed",
                read,
                bytes.len()
            )));
        }
        Ok(tx)
    }

    /// SHA-256 of the canonical bytes; the transaction's identity.
    pub fn hash(&self) -> Result<[u8; HASH_LEN], TxError> {
        Ok(sha256(&self.to_bytes()?))
    }

    /// Declared gas limit, as used by block assembly.
    pub fn gas(&self) -> i64 {
        self.auth_info.gas_limit as i64
    }

    /// The signer's account address, derived from the embedded public key.
    pub fn signer_address(&self) -> String {
        self.auth_info.pubkey.account_address()
    }

    /// `true` if any message in the body is a `CommitSegment`.
    pub fn contains_commit_segment(&self) -> bool {
        self.body
            .messages
            .iter()
            .any(|m| matches!(m, Msg::CommitSegment(_)))
    }

    /// Returns the commitment message if this transaction is exactly one
    /// `CommitSegment` and nothing else.
    pub fn sole_commit_segment(&self) -> Option<&MsgCommitSegment> {
        match self.body.messages.as_slice() {
            [Msg::CommitSegment(m)] => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Msg, MsgUpdateParams, Params, SegmentCommitment};

    fn dummy_body() -> TxBody {
        TxBody {
            messages: vec![Msg::UpdateParams(MsgUpdateParams {
                authority: "auc1authority".to_string(),
                params: Params::default(),
            })],
            memo: "tx 1".to_string(),
        }
    }

    fn signed_tx(chain_id: &str) -> Tx {
        let key = Key::generate();
        Tx::sign(&key, chain_id, dummy_body(), 3, 7, 100_000, vec![Coin::new(5, "stake")])
            .expect("signing should succeed")
    }

    #[test]
    fn encode_decode_roundtrip() {
        let tx = signed_tx("auction-99");
        let bytes = tx.to_bytes().expect("encode");
        let decoded = Tx::decode(&bytes).expect("decode");

        assert_eq!(decoded, tx);
        assert_eq!(decoded.gas(), 100_000);
    }

    #[test]
    fn decode_rejects_garbage_and_trailing_bytes() {
        assert!(Tx::decode(b"definitely not a tx").is_err());

        let tx = signed_tx("auction-99");
        let mut bytes = tx.to_bytes().expect("encode");
        bytes.push(0);
        assert!(Tx::decode(&bytes).is_err());
    }

    #[test]
    fn signature_binds_chain_id() {
        let tx = signed_tx("auction-99");
        assert!(tx.verify_signature("auction-99"));
        assert!(!tx.verify_signature("auction-100"));
    }

    #[test]
    fn signature_binds_body() {
        let mut tx = signed_tx("auction-99");
        tx.body.memo = "tx 2".to_string();
        assert!(!tx.verify_signature("auction-99"));
    }

    #[test]
    fn sign_rejects_empty_body() {
        let key = Key::generate();
        let result = Tx::sign(&key, "auction-99", TxBody::default(), 0, 0, 0, Vec::new());
        assert!(matches!(result, Err(TxError::NoMessages)));
    }

    #[test]
    fn sole_commit_segment_requires_exactly_one_message() {
        let key = Key::generate();
        let commit = Msg::CommitSegment(MsgCommitSegment {
            builder_address: key.address.clone(),
            commitment: SegmentCommitment::default(),
        });

        let single = Tx::sign(
            &key,
            "auction-99",
            TxBody {
                messages: vec![commit.clone()],
                memo: String::new(),
            },
            0,
            0,
            100_000,
            Vec::new(),
        )
        .expect("sign");
        assert!(single.sole_commit_segment().is_some());
        assert!(single.contains_commit_segment());

        let double = Tx::sign(
            &key,
            "auction-99",
            TxBody {
                messages: vec![commit.clone(), commit],
                memo: String::new(),
            },
            0,
            0,
            100_000,
            Vec::new(),
        )
        .expect("sign");
        assert!(double.sole_commit_segment().is_none());
        assert!(double.contains_commit_segment());
    }

    #[test]
    fn hash_is_deterministic() {
        let tx = signed_tx("auction-99");
        assert_eq!(tx.hash().expect("hash"), tx.hash().expect("hash"));
    }
}

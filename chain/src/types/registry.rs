//! Registered builder and proposer records.

use serde::{Deserialize, Serialize};

use super::keys::PubKey;

/// A registered off-chain block builder.
///
/// Builders register once and may edit the mutable fields later. The
/// address is derived from the public key and is the record's identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Builder {
    /// Bech32 account address, derived from `pubkey`.
    pub address: String,
    /// Public key bids and commitments are verified against.
    pub pubkey: PubKey,
    /// Human-readable name.
    pub moniker: String,
    /// Version string of the builder's HTTP API.
    pub builder_api_version: String,
    /// Base URL of the builder's HTTP API.
    pub builder_api_url: String,
    /// Contact for security disclosures.
    pub security_contact: String,
}

/// A registered proposer: a module-level signing key bound to a validator.
///
/// The module key signs bid and commit requests off-chain; the operator
/// binding establishes that a real validator stands behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposer {
    /// Bech32 account address of the module signing key.
    pub address: String,
    /// Module signing key, derived into `address`.
    pub pubkey: PubKey,
    /// Bech32 operator address of the backing validator.
    pub operator_address: String,
    /// Operator public key, derived into `operator_address`.
    pub operator_pubkey: PubKey,
}

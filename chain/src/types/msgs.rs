//! On-chain messages of the auction module.
//!
//! Messages appear inside transaction bodies and are dispatched by tag.
//! Each message knows its expected signer and can perform stateless
//! validation (`validate_basic`); stateful checks live in the handlers.

use serde::{Deserialize, Serialize};
use url::Url;

use super::address;
use super::commitment::SegmentCommitment;
use super::error::ModuleError;
use super::keys::PubKey;
use super::params::Params;

/// Registers a new builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgRegisterBuilder {
    pub address: String,
    pub pubkey: PubKey,
    pub moniker: String,
    pub builder_api_version: String,
    pub builder_api_url: String,
    pub security_contact: String,
}

/// Updates a registered builder's mutable fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgEditBuilder {
    pub address: String,
    pub moniker: String,
    pub builder_api_version: String,
    pub builder_api_url: String,
    pub security_contact: String,
}

/// Registers a proposer's module signing key under a validator operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgRegisterProposer {
    pub address: String,
    pub pubkey: PubKey,
    pub operator_address: String,
    pub operator_pubkey: PubKey,
}

/// Records a segment commitment on-chain and pays the promised amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgCommitSegment {
    pub builder_address: String,
    pub commitment: SegmentCommitment,
}

/// Reports a proposer that committed to a segment but omitted it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgReportProposer {
    pub builder_address: String,
    pub commitment: SegmentCommitment,
}

/// Replaces the module parameters. Only the module authority may send this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: String,
    pub params: Params,
}

/// Every message kind the auction module handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Msg {
    RegisterBuilder(MsgRegisterBuilder),
    EditBuilder(MsgEditBuilder),
    RegisterProposer(MsgRegisterProposer),
    CommitSegment(MsgCommitSegment),
    ReportProposer(MsgReportProposer),
    UpdateParams(MsgUpdateParams),
}

fn require_nonempty(value: &str, what: &str) -> Result<(), ModuleError> {
    if value.is_empty() {
        return Err(ModuleError::InvalidRequest(format!("empty {what}")));
    }
    Ok(())
}

fn require_valid_url(value: &str) -> Result<(), ModuleError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ModuleError::InvalidRequest(format!("builder API URL invalid: {e}")))
}

fn require_account_address(value: &str, what: &str) -> Result<(), ModuleError> {
    address::validate_account_address(value)
        .map_err(|e| ModuleError::InvalidRequest(format!("invalid {what} ({e})")))
}

impl MsgRegisterBuilder {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        require_account_address(&self.address, "address")?;
        require_nonempty(&self.moniker, "moniker")?;
        require_nonempty(&self.builder_api_version, "builder API version")?;
        require_nonempty(&self.builder_api_url, "builder API URL")?;
        require_valid_url(&self.builder_api_url)?;
        require_nonempty(&self.security_contact, "security contact")?;
        Ok(())
    }
}

impl MsgEditBuilder {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        require_account_address(&self.address, "address")
    }
}

impl MsgRegisterProposer {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        require_account_address(&self.address, "address")?;
        address::validate_operator_address(&self.operator_address)
            .map_err(|e| ModuleError::InvalidRequest(format!("invalid operator address ({e})")))?;
        Ok(())
    }
}

fn validate_commitment_carrier(
    builder_address: &str,
    commitment: &SegmentCommitment,
) -> Result<(), ModuleError> {
    require_account_address(builder_address, "builder address")?;

    if builder_address != commitment.builder_address {
        return Err(ModuleError::InvalidRequest(format!(
            "builder address mismatch ({:?} != {:?})",
            builder_address, commitment.builder_address,
        )));
    }

    require_account_address(&commitment.proposer_address, "proposer address")?;

    Ok(())
}

impl MsgCommitSegment {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        validate_commitment_carrier(&self.builder_address, &self.commitment)
    }
}

impl MsgReportProposer {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        validate_commitment_carrier(&self.builder_address, &self.commitment)
    }
}

impl MsgUpdateParams {
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        require_account_address(&self.authority, "authority")?;
        self.params.validate()?;
        Ok(())
    }
}

impl Msg {
    /// Stateless validation, run before any state is touched.
    pub fn validate_basic(&self) -> Result<(), ModuleError> {
        match self {
            Msg::RegisterBuilder(m) => m.validate_basic(),
            Msg::EditBuilder(m) => m.validate_basic(),
            Msg::RegisterProposer(m) => m.validate_basic(),
            Msg::CommitSegment(m) => m.validate_basic(),
            Msg::ReportProposer(m) => m.validate_basic(),
            Msg::UpdateParams(m) => m.validate_basic(),
        }
    }

    /// The account address expected to have signed the enclosing
    /// transaction.
    pub fn signer(&self) -> Result<String, ModuleError> {
        match self {
            Msg::RegisterBuilder(m) => Ok(m.address.clone()),
            Msg::EditBuilder(m) => Ok(m.address.clone()),
            Msg::RegisterProposer(m) => address::operator_to_account(&m.operator_address)
                .map_err(|e| ModuleError::InvalidRequest(format!("operator address: {e}"))),
            Msg::CommitSegment(m) => Ok(m.builder_address.clone()),
            Msg::ReportProposer(m) => Ok(m.builder_address.clone()),
            Msg::UpdateParams(m) => Ok(m.authority.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Key;

    fn register_builder_msg() -> MsgRegisterBuilder {
        let key = Key::generate();
        MsgRegisterBuilder {
            address: key.address.clone(),
            pubkey: key.pub_key,
            moniker: "builder-one".to_string(),
            builder_api_version: "v0".to_string(),
            builder_api_url: "http://127.0.0.1:9099".to_string(),
            security_contact: "security@builder.example".to_string(),
        }
    }

    #[test]
    fn register_builder_accepts_complete_message() {
        register_builder_msg().validate_basic().expect("valid message");
    }

    #[test]
    fn register_builder_rejects_missing_fields() {
        let mut msg = register_builder_msg();
        msg.moniker = String::new();
        assert!(msg.validate_basic().is_err());

        let mut msg = register_builder_msg();
        msg.builder_api_url = "not a url".to_string();
        assert!(msg.validate_basic().is_err());

        let mut msg = register_builder_msg();
        msg.address = "bogus".to_string();
        assert!(msg.validate_basic().is_err());
    }

    #[test]
    fn commit_segment_requires_matching_builder_address() {
        let key = Key::generate();
        let msg = MsgCommitSegment {
            builder_address: key.address.clone(),
            commitment: SegmentCommitment {
                builder_address: Key::generate().address,
                proposer_address: Key::generate().address,
                ..Default::default()
            },
        };
        assert!(msg.validate_basic().is_err());
    }

    #[test]
    fn register_proposer_signer_is_operator_account() {
        let module_key = Key::generate();
        let operator_key = Key::generate();
        let msg = Msg::RegisterProposer(MsgRegisterProposer {
            address: module_key.address.clone(),
            pubkey: module_key.pub_key.clone(),
            operator_address: operator_key.pub_key.operator_address(),
            operator_pubkey: operator_key.pub_key.clone(),
        });

        let signer = msg.signer().expect("signer derivable");
        assert_eq!(signer, operator_key.address);
    }
}

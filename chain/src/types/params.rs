//! Auction module parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address;

pub const DEFAULT_MAX_EVIDENCE_AGE_NUM_BLOCKS: i64 = 100;
pub const DEFAULT_MAX_BUILDERS_PER_AUCTION: i64 = 5;

/// Errors produced by [`Params::validate`].
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("max_evidence_age_num_blocks={0} < 1")]
    MaxEvidenceAge(i64),
    #[error("max_builders_per_auction={0} < 1")]
    MaxBuildersPerAuction(i64),
    #[error("allowed_builder_addresses: {0}")]
    AllowedBuilderAddress(#[from] address::AddressError),
}

/// Governance-controlled parameters of the auction module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// How many blocks a commitment may lag the chain tip before it can no
    /// longer be reported (and gets pruned from state).
    pub max_evidence_age_num_blocks: i64,
    /// Upper bound on builders solicited in a single auction.
    pub max_builders_per_auction: i64,
    /// Optional whitelist of builder addresses. Empty means all registered
    /// builders are eligible.
    pub allowed_builder_addresses: Vec<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_evidence_age_num_blocks: DEFAULT_MAX_EVIDENCE_AGE_NUM_BLOCKS,
            max_builders_per_auction: DEFAULT_MAX_BUILDERS_PER_AUCTION,
            allowed_builder_addresses: Vec::new(),
        }
    }
}

impl Params {
    /// Validates the parameter set; called before every store write.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_evidence_age_num_blocks < 1 {
            return Err(ParamsError::MaxEvidenceAge(self.max_evidence_age_num_blocks));
        }

        if self.max_builders_per_auction < 1 {
            return Err(ParamsError::MaxBuildersPerAuction(
                self.max_builders_per_auction,
            ));
        }

        for addr in &self.allowed_builder_addresses {
            address::validate_account_address(addr)?;
        }

        Ok(())
    }
}

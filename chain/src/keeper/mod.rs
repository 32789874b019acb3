//! Typed state store of the auction module.
//!
//! The [`Keeper`] wraps an ordered [`KvStore`] with the module's key layout
//! and typed accessors. Values are encoded with the same canonical
//! bincode-2 configuration used for transactions.
//!
//! Key layout (all keys are raw bytes, segments joined as shown):
//!
//! | Prefix                      | Key                              | Value              |
//! |-----------------------------|----------------------------------|--------------------|
//! | `Builder/value/`            | `<address>/`                     | `Builder`          |
//! | `Proposer/value/`           | `<address>/`                     | `Proposer`         |
//! | `Proposer/operator-addr/`   | `<operatorAddress>/`             | raw address bytes  |
//! | `SegmentCommitment/value/`  | `<signaturesHash>`               | `SegmentCommitment`|
//! | `ProposerInfraction/`       | `<proposerAddress>/<sigHash>`    | `SegmentCommitment`|
//! | (module root)               | `Params`                         | `Params`           |

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::KvStore;
use crate::types::{Params, MODULE_NAME};

mod builders;
mod commitments;
pub mod external;
pub mod genesis;
mod infractions;
pub mod msg_server;
mod proposers;

pub use external::{
    AccountKeeper, BankError, BankKeeper, MemBank, MemStaking, ModuleAccounts, StakingKeeper,
    Validator,
};
pub use genesis::GenesisState;
pub use msg_server::MsgServer;

pub(crate) const BUILDER_KEY_PREFIX: &str = "Builder/value/";
pub(crate) const PROPOSER_KEY_PREFIX: &str = "Proposer/value/";
pub(crate) const PROPOSER_OPERATOR_INDEX_PREFIX: &str = "Proposer/operator-addr/";
pub(crate) const SEGMENT_COMMITMENT_KEY_PREFIX: &str = "SegmentCommitment/value/";
pub(crate) const PROPOSER_INFRACTION_KEY_PREFIX: &str = "ProposerInfraction/";
pub(crate) const PARAMS_KEY: &str = "Params";

/// Typed facade over the module's slice of the state store.
///
/// Account resolution goes through the injected [`AccountKeeper`]; the
/// keeper itself never derives addresses.
pub struct Keeper<S: KvStore> {
    store: S,
    accounts: Box<dyn AccountKeeper>,
    authority: String,
}

impl<S: KvStore> Keeper<S> {
    /// Creates a keeper over `store` with the default [`ModuleAccounts`]
    /// resolver. `authority` is the only account allowed to update module
    /// parameters.
    pub fn new(store: S, authority: impl Into<String>) -> Self {
        Self {
            store,
            accounts: Box::new(ModuleAccounts),
            authority: authority.into(),
        }
    }

    /// Replaces the account keeper, for nodes whose account module owns
    /// module-address assignment.
    pub fn with_account_keeper(mut self, accounts: Box<dyn AccountKeeper>) -> Self {
        self.accounts = accounts;
        self
    }

    /// The account allowed to send `MsgUpdateParams`.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Address of the named module's account, per the account keeper.
    pub fn module_address(&self, module_name: &str) -> String {
        self.accounts.module_address(module_name)
    }

    /// Address of the module account auction payments accrue to.
    pub fn module_account_address(&self) -> String {
        self.module_address(MODULE_NAME)
    }

    /// Current module parameters, or defaults if none were ever stored.
    pub fn params(&self) -> Params {
        self.store
            .get(PARAMS_KEY.as_bytes())
            .and_then(|data| decode(&data))
            .unwrap_or_default()
    }

    /// Validates and stores new module parameters.
    pub fn set_params(&mut self, params: Params) -> Result<(), crate::types::ModuleError> {
        params.validate()?;
        self.store.set(PARAMS_KEY.as_bytes(), encode(&params));
        Ok(())
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

/// Encodes a state value with the canonical bincode configuration.
///
/// # Panics
///
/// Panics if encoding fails; all state types are plain data, so a failure
/// here is a programming error.
pub(crate) fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .expect("state values should always encode")
}

/// Decodes a state value, logging and returning `None` on corruption.
pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Option<T> {
    match bincode::serde::decode_from_slice(data, bincode::config::standard()) {
        Ok((value, _)) => Some(value),
        Err(e) => {
            tracing::error!(err = %e, "error decoding state value");
            None
        }
    }
}

//! Genesis initialization and export.

use serde::{Deserialize, Serialize};

use crate::store::KvStore;
use crate::types::{Builder, ModuleError, Params, Proposer};

use super::Keeper;

/// The auction module's genesis state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub builders: Vec<Builder>,
    pub proposers: Vec<Proposer>,
}

/// Initializes module state from a genesis document.
pub fn init_genesis<S: KvStore>(
    keeper: &mut Keeper<S>,
    state: GenesisState,
) -> Result<(), ModuleError> {
    keeper.set_params(state.params)?;

    for builder in &state.builders {
        keeper.set_builder(builder);
    }

    for proposer in &state.proposers {
        keeper.set_proposer(proposer);
    }

    Ok(())
}

/// Exports current module state as a genesis document.
pub fn export_genesis<S: KvStore>(keeper: &Keeper<S>) -> GenesisState {
    GenesisState {
        params: keeper.params(),
        builders: keeper.builders(),
        proposers: keeper.proposers(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemKvStore;
    use crate::types::Key;

    fn dummy_genesis() -> GenesisState {
        let builder_key = Key::generate();
        let module_key = Key::generate();
        let operator_key = Key::generate();

        GenesisState {
            params: Params {
                max_builders_per_auction: 2,
                ..Default::default()
            },
            builders: vec![Builder {
                address: builder_key.address.clone(),
                pubkey: builder_key.pub_key,
                moniker: "genesis-builder".to_string(),
                builder_api_version: "v0".to_string(),
                builder_api_url: "http://127.0.0.1:9099".to_string(),
                security_contact: "security@builder.example".to_string(),
            }],
            proposers: vec![Proposer {
                address: module_key.address.clone(),
                pubkey: module_key.pub_key,
                operator_address: operator_key.pub_key.operator_address(),
                operator_pubkey: operator_key.pub_key,
            }],
        }
    }

    #[test]
    fn init_then_export_roundtrips() {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        let genesis = dummy_genesis();

        init_genesis(&mut keeper, genesis.clone()).expect("init should succeed");
        let exported = export_genesis(&keeper);

        assert_eq!(exported, genesis);
    }

    #[test]
    fn init_rejects_invalid_params() {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        let mut genesis = dummy_genesis();
        genesis.params.max_evidence_age_num_blocks = 0;

        assert!(init_genesis(&mut keeper, genesis).is_err());
    }
}

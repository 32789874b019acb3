//! Proposer records and the operator-address index.

use crate::store::KvStore;
use crate::types::Proposer;

use super::{decode, encode, Keeper, PROPOSER_KEY_PREFIX, PROPOSER_OPERATOR_INDEX_PREFIX};

fn proposer_key(address: &str) -> Vec<u8> {
    format!("{PROPOSER_KEY_PREFIX}{address}/").into_bytes()
}

fn operator_index_key(operator_address: &str) -> Vec<u8> {
    format!("{PROPOSER_OPERATOR_INDEX_PREFIX}{operator_address}/").into_bytes()
}

impl<S: KvStore> Keeper<S> {
    /// Stores a proposer under its address and indexes it by operator.
    pub fn set_proposer(&mut self, proposer: &Proposer) {
        self.store_mut()
            .set(&proposer_key(&proposer.address), encode(proposer));
        self.store_mut().set(
            &operator_index_key(&proposer.operator_address),
            proposer.address.clone().into_bytes(),
        );
    }

    /// Returns the proposer registered under `address`, if any.
    pub fn proposer(&self, address: &str) -> Option<Proposer> {
        let data = self.store().get(&proposer_key(address))?;
        decode(&data)
    }

    /// Returns the proposer whose backing validator is `operator_address`.
    pub fn proposer_by_operator_address(&self, operator_address: &str) -> Option<Proposer> {
        let address = self.store().get(&operator_index_key(operator_address))?;
        let address = String::from_utf8(address).ok()?;
        self.proposer(&address)
    }

    /// Returns all registered proposers in address order.
    pub fn proposers(&self) -> Vec<Proposer> {
        self.store()
            .prefix_scan(PROPOSER_KEY_PREFIX.as_bytes())
            .iter()
            .filter_map(|(_, data)| decode(data))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemKvStore;
    use crate::types::Key;

    fn dummy_proposer() -> Proposer {
        let module_key = Key::generate();
        let operator_key = Key::generate();
        Proposer {
            address: module_key.address,
            pubkey: module_key.pub_key,
            operator_address: operator_key.pub_key.operator_address(),
            operator_pubkey: operator_key.pub_key,
        }
    }

    #[test]
    fn set_get_roundtrip() {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        let proposer = dummy_proposer();

        keeper.set_proposer(&proposer);
        let fetched = keeper.proposer(&proposer.address).expect("stored");
        assert_eq!(fetched, proposer);
    }

    #[test]
    fn operator_index_resolves_to_proposer() {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        let proposer = dummy_proposer();
        keeper.set_proposer(&proposer);

        let fetched = keeper
            .proposer_by_operator_address(&proposer.operator_address)
            .expect("indexed");
        assert_eq!(fetched.address, proposer.address);

        assert!(keeper.proposer_by_operator_address("aucval1unknown").is_none());
    }

    #[test]
    fn proposers_lists_every_registration() {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        for _ in 0..3 {
            keeper.set_proposer(&dummy_proposer());
        }
        assert_eq!(keeper.proposers().len(), 3);
    }
}

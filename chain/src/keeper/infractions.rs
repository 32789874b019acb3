//! Recorded proposer infractions.
//!
//! An infraction is a valid segment commitment that never made it on-chain
//! at its height: the builder holds both signatures, but no matching
//! commitment was stored. Infractions are keyed by proposer so downstream
//! consumers (governance, slashing, dashboards) can scan per proposer.

use crate::store::KvStore;
use crate::types::SegmentCommitment;

use super::{decode, encode, Keeper, PROPOSER_INFRACTION_KEY_PREFIX};

fn infraction_key(proposer_address: &str, signatures_hash: &[u8]) -> Vec<u8> {
    let mut key = format!("{PROPOSER_INFRACTION_KEY_PREFIX}{proposer_address}/").into_bytes();
    key.extend_from_slice(signatures_hash);
    key
}

fn infraction_prefix(proposer_address: &str) -> Vec<u8> {
    format!("{PROPOSER_INFRACTION_KEY_PREFIX}{proposer_address}/").into_bytes()
}

impl<S: KvStore> Keeper<S> {
    /// Records an infraction under `(proposer, signaturesHash)`.
    pub fn set_proposer_infraction(&mut self, sc: &SegmentCommitment) {
        let key = infraction_key(&sc.proposer_address, &sc.signatures_hash());
        self.store_mut().set(&key, encode(sc));
    }

    /// Returns all recorded infractions for a proposer.
    pub fn proposer_infractions(&self, proposer_address: &str) -> Vec<SegmentCommitment> {
        self.store()
            .prefix_scan(&infraction_prefix(proposer_address))
            .iter()
            .filter_map(|(_, data)| decode(data))
            .collect()
    }

    /// Deletes every recorded infraction with `height < min_height`.
    pub fn delete_old_proposer_infractions(&mut self, min_height: i64) {
        let stale: Vec<Vec<u8>> = self
            .store()
            .prefix_scan(PROPOSER_INFRACTION_KEY_PREFIX.as_bytes())
            .iter()
            .filter(|(_, data)| {
                decode::<SegmentCommitment>(data).is_some_and(|sc| sc.height < min_height)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            self.store_mut().delete(&key);
        }
    }
}

//! Stored segment commitments, keyed by signatures hash.

use crate::store::KvStore;
use crate::types::SegmentCommitment;

use super::{decode, encode, Keeper, SEGMENT_COMMITMENT_KEY_PREFIX};

fn commitment_key(signatures_hash: &[u8]) -> Vec<u8> {
    let mut key = SEGMENT_COMMITMENT_KEY_PREFIX.as_bytes().to_vec();
    key.extend_from_slice(signatures_hash);
    key
}

impl<S: KvStore> Keeper<S> {
    /// Stores a segment commitment under its signatures hash.
    pub fn set_segment_commitment(&mut self, sc: &SegmentCommitment) {
        let key = commitment_key(&sc.signatures_hash());
        self.store_mut().set(&key, encode(sc));
    }

    /// Returns the commitment stored under `signatures_hash`, if any.
    pub fn segment_commitment(&self, signatures_hash: &[u8]) -> Option<SegmentCommitment> {
        let data = self.store().get(&commitment_key(signatures_hash))?;
        decode(&data)
    }

    /// Returns the commitment recorded for `height`, if any.
    ///
    /// Commitments are stored by signatures hash; this scans the prefix,
    /// which is fine because pruning keeps the set small.
    pub fn segment_commitment_by_height(&self, height: i64) -> Option<SegmentCommitment> {
        self.store()
            .prefix_scan(SEGMENT_COMMITMENT_KEY_PREFIX.as_bytes())
            .iter()
            .filter_map(|(_, data)| decode::<SegmentCommitment>(data))
            .find(|sc| sc.height == height)
    }

    /// Deletes every stored commitment with `height < min_height`.
    pub fn delete_old_segment_commitments(&mut self, min_height: i64) {
        let stale: Vec<Vec<u8>> = self
            .store()
            .prefix_scan(SEGMENT_COMMITMENT_KEY_PREFIX.as_bytes())
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

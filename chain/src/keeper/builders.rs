//! Builder records and auction-eligible builder selection.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::store::KvStore;
use crate::types::{Builder, Context};

use super::{decode, encode, Keeper, BUILDER_KEY_PREFIX};

fn builder_key(address: &str) -> Vec<u8> {
    format!("{BUILDER_KEY_PREFIX}{address}/").into_bytes()
}

impl<S: KvStore> Keeper<S> {
    /// Stores a builder under its address.
    pub fn set_builder(&mut self, builder: &Builder) {
        let key = builder_key(&builder.address);
        self.store_mut().set(&key, encode(builder));
    }

    /// Returns the builder registered under `address`, if any.
    pub fn builder(&self, address: &str) -> Option<Builder> {
        let data = self.store().get(&builder_key(address))?;
        decode(&data)
    }

    /// Removes a builder from the store.
    pub fn remove_builder(&mut self, address: &str) {
        self.store_mut().delete(&builder_key(address));
    }

    /// Returns all registered builders in address order.
    pub fn builders(&self) -> Vec<Builder> {
        self.store()
            .prefix_scan(BUILDER_KEY_PREFIX.as_bytes())
            .iter()
            .filter_map(|(_, data)| decode(data))
            .collect()
    }

    /// Returns up to `max_builders_per_auction` builders eligible for the
    /// auction at the context's height.
    ///
    /// If the allowlist param is non-empty, only listed builders are
    /// eligible. The eligible set is then shuffled with an RNG seeded by
    /// the block height, so every validator replaying this height selects
    /// the same builders, and truncated to the per-auction cap.
    pub fn auction_builders(&self, ctx: &Context) -> Vec<Builder> {
        let params = self.params();

        let mut builders = self.builders();
        if !params.allowed_builder_addresses.is_empty() {
            builders.retain(|b| {
                params
                    .allowed_builder_addresses
                    .iter()
                    .any(|allowed| allowed == &b.address)
            });
        }

        let mut rng = StdRng::seed_from_u64(ctx.block_height as u64);
        builders.shuffle(&mut rng);

        builders.truncate(params.max_builders_per_auction.max(0) as usize);
        builders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemKvStore;
    use crate::types::{Key, Params};

    fn dummy_builder(moniker: &str) -> Builder {
        let key = Key::generate();
        Builder {
            address: key.address,
            pubkey: key.pub_key,
            moniker: moniker.to_string(),
            builder_api_version: "v0".to_string(),
            builder_api_url: "http://127.0.0.1:9099".to_string(),
            security_contact: "security@builder.example".to_string(),
        }
    }

    fn keeper_with_builders(n: usize) -> (Keeper<MemKvStore>, Vec<Builder>) {
        let mut keeper = Keeper::new(MemKvStore::new(), "auc1authority");
        let builders: Vec<Builder> = (0..n).map(|i| dummy_builder(&format!("b{i}"))).collect();
        for b in &builders {
            keeper.set_builder(b);
        }
        (keeper, builders)
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let (mut keeper, builders) = keeper_with_builders(1);
        let b = &builders[0];

        let fetched = keeper.builder(&b.address).expect("builder stored");
        assert_eq!(&fetched, b);

        keeper.remove_builder(&b.address);
        assert!(keeper.builder(&b.address).is_none());
    }

    #[test]
    fn builders_returns_all_registered() {
        let (keeper, builders) = keeper_with_builders(4);
        assert_eq!(keeper.builders().len(), builders.len());
    }

    #[test]
    fn auction_builders_caps_at_param() {
        let (mut keeper, _) = keeper_with_builders(8);
        keeper
            .set_params(Params {
                max_builders_per_auction: 3,
                ..Default::default()
            })
            .expect("valid params");

        let ctx = Context::new("auction-99", 42);
        assert_eq!(keeper.auction_builders(&ctx).len(), 3);
    }

    #[test]
    fn auction_builders_is_deterministic_per_height() {
        let (keeper, _) = keeper_with_builders(8);
        let ctx = Context::new("auction-99", 42);

        let first = keeper.auction_builders(&ctx);
        let second = keeper.auction_builders(&ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn auction_builders_respects_allowlist() {
        let (mut keeper, builders) = keeper_with_builders(5);
        let allowed = builders[2].address.clone();
        keeper
            .set_params(Params {
                allowed_builder_addresses: vec![allowed.clone()],
                ..Default::default()
            })
            .expect("valid params");

        let ctx = Context::new("auction-99", 7);
        let selected = keeper.auction_builders(&ctx);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].address, allowed);
    }
}

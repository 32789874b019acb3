//! Storage backends for chain state.
//!
//! This module defines the ordered key-value interface the keeper is built
//! on, together with concrete implementations:
//!
//! - an in-memory store ([`mem::MemKvStore`]) suitable for tests and
//!   devnets,
//! - a RocksDB-backed store ([`rocksdb::RocksDbKvStore`]) for persistent
//!   validator nodes.
//!
//! The keeper owns the key layout; backends only provide ordered bytes.

pub mod mem;
pub mod rocksdb;

pub use mem::MemKvStore;
// `self::` keeps the module path from clashing with the rocksdb crate.
pub use self::rocksdb::{RocksDbConfig, RocksDbKvStore};

/// Abstract ordered key-value store used by the keeper.
///
/// Implementations must iterate prefixes in ascending lexicographic key
/// order, since the block state machine requires deterministic iteration.
pub trait KvStore {
    /// Fetches the value stored under `key`, if present.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    /// Removes `key`, if present.
    fn delete(&mut self, key: &[u8]);

    /// Returns all `(key, value)` pairs whose key starts with `prefix`, in
    /// ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

//! Chain library crate.
//!
//! This crate provides the core building blocks for the off-chain
//! block-building auction:
//!
//! - strongly-typed domain and wire types (`types`),
//! - the typed state store of the auction module (`keeper`),
//! - ordered key-value storage backends (`store`),
//! - the proposer-side auction engine (`auction`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries compose these pieces into validator nodes,
//! simulators, and experiment harnesses; the companion `builder-api`
//! crate implements the builder side of the protocol on top of the same
//! wire types.

pub mod auction;
pub mod config;
pub mod keeper;
pub mod metrics;
pub mod store;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ChainConfig, MetricsConfig, ProposerKeyConfig};

// Re-export "core" auction types.
pub use auction::{
    block_transactions, default_auction_func, default_payment_func, end_block,
    filter_commit_segment_txs, AuctionBid, AuctionEngine, EngineConfig, HttpPoster, Payment,
    Preference, Preferences, ReqwestPoster, SimulateFn,
};

// Re-export the keeper and the external collaborator interfaces.
pub use keeper::{
    AccountKeeper, BankKeeper, GenesisState, Keeper, MemBank, MemStaking, ModuleAccounts,
    MsgServer, StakingKeeper, Validator,
};

// Re-export storage backends.
pub use store::{KvStore, MemKvStore, RocksDbConfig, RocksDbKvStore};

// Re-export metrics registry and exporter.
pub use metrics::{serve_metrics, AuctionMetrics, MetricsRegistry};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default store backend of a persistent node.
pub type DefaultKvStore = RocksDbKvStore;

/// Type alias for the default keeper stack used by a "typical" node.
pub type DefaultKeeper = Keeper<DefaultKvStore>;

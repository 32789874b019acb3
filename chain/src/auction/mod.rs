//! Proposer-side auction engine and related pieces.
//!
//! This module implements the block-proposal path of the auction protocol:
//!
//! - application preferences over block contents ([`preferences`]),
//! - the winning-bid selection policy ([`select`]),
//! - block assembly under size/gas limits ([`assembly`]),
//! - the parallel bid fan-out and response validation ([`bids`]),
//! - the engine itself, with `prepare_proposal`, `process_proposal`, and
//!   commitment validation ([`engine`]),
//! - end-of-block payment distribution and pruning ([`end_block`]).

pub mod assembly;
pub mod bids;
pub mod end_block;
pub mod engine;
pub mod preferences;
pub mod select;

pub use assembly::{block_transactions, AssemblyError};
pub use bids::{BidError, HttpPoster, ReqwestPoster, TransportError};
pub use end_block::{default_payment_func, end_block, Payment, PaymentFn};
pub use engine::{
    filter_commit_segment_txs, AuctionEngine, EngineConfig, PrefixFn, SimulateFn,
    ValidateCommitmentConfig, ValidateCommitmentError,
};
pub use preferences::{Preference, Preferences};
pub use select::{default_auction_func, AuctionBid, AuctionFn, SelectError};

//! Bid store and retention rules.
//!
//! Once placed, a bid is immutable and must be returned unchanged to every
//! request for the same auction, so bids are persisted keyed by
//! `(proposer, chain, height)`. The store tracks each bid's state through
//! its lifecycle:
//!
//! ```text
//! Pending --commit--> Won --verified-in-block--> Included ----> (deleted)
//!                      \--not-included + reported--> Reported -> (deleted)
//! Pending --age-out--> (deleted)
//! ```
//!
//! Reads take a shared lock, writes an exclusive one.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use thiserror::Error;

use chain::types::SegmentCommitment;

/// Errors produced by bid store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("bid not found")]
    NotFound,
    #[error("bid already exists (chain={chain_id} height={height})")]
    AlreadyExists { chain_id: String, height: i64 },
    #[error("invalid bid: {0}")]
    InvalidBid(&'static str),
}

/// Lifecycle state of a bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BidState {
    /// Placed, auction not yet decided.
    Pending,
    /// Received a commitment; awaiting inclusion verification.
    Won,
    /// Verified as part of the auctioned block.
    Included,
    /// Verified as missing; the proposer has been reported.
    Reported,
}

/// A sealed bid for one auction.
#[derive(Clone, Debug)]
pub struct Bid {
    pub proposer_address: String,
    pub chain_id: String,
    pub height: i64,

    pub preference_ids: Vec<String>,
    pub prefix_hash: Vec<u8>,
    pub prefix_length: i64,
    pub segment_hash: Vec<u8>,
    pub segment_length: i64,
    pub segment_bytes: i64,
    pub segment_gas: i64,
    pub segment_transactions: Vec<Vec<u8>>,
    pub payment_promise: String,

    pub segment_commitment: Option<SegmentCommitment>,
    pub segment_commitment_transaction: Vec<u8>,

    pub created_at: Instant,
    pub updated_at: Instant,
    pub state: BidState,
}

impl Bid {
    /// The store key of this bid.
    pub fn key(&self) -> (String, String, i64) {
        (
            self.proposer_address.clone(),
            self.chain_id.clone(),
            self.height,
        )
    }
}

/// Persistence interface for bids.
pub trait BidStore: Send + Sync {
    /// Inserts a new bid. Fails if one already exists for the auction.
    fn insert(&self, bid: Bid) -> Result<(), StoreError>;

    /// Merges commitment, commitment transaction, and state changes from
    /// `bid` into the stored bid for the same auction.
    fn update(&self, bid: &Bid) -> Result<(), StoreError>;

    /// Returns the bid for `(proposer, chain, height)`.
    fn select(&self, proposer: &str, chain_id: &str, height: i64) -> Result<Bid, StoreError>;

    /// Returns all bids, ordered by height ascending.
    fn list(&self) -> Vec<Bid>;

    /// Removes the bid for `(proposer, chain, height)`, if present.
    fn delete(&self, proposer: &str, chain_id: &str, height: i64) -> Result<(), StoreError>;
}

/// In-memory [`BidStore`] behind a read/write lock.
#[derive(Default)]
pub struct MemBidStore {
    bids: RwLock<HashMap<(String, String, i64), Bid>>,
}

impl MemBidStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_bid(bid: &Bid) -> Result<(), StoreError> {
    if bid.chain_id.is_empty() {
        return Err(StoreError::InvalidBid("empty chain ID"));
    }
    if bid.height <= 0 {
        return Err(StoreError::InvalidBid("non-positive height"));
    }
    Ok(())
}

impl BidStore for MemBidStore {
    fn insert(&self, mut bid: Bid) -> Result<(), StoreError> {
        validate_bid(&bid)?;

        let now = Instant::now();
        bid.created_at = now;
        bid.updated_at = now;

        let mut bids = self.bids.write().expect("bid store lock poisoned");
        let key = bid.key();
        if bids.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                chain_id: bid.chain_id,
                height: bid.height,
            });
        }

        bids.insert(key, bid);
        Ok(())
    }

    fn update(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut bids = self.bids.write().expect("bid store lock poisoned");
        let stored = bids.get_mut(&bid.key()).ok_or(StoreError::NotFound)?;

        if bid.segment_commitment.is_some() {
            stored.segment_commitment = bid.segment_commitment.clone();
        }
        if !bid.segment_commitment_transaction.is_empty() {
            stored.segment_commitment_transaction = bid.segment_commitment_transaction.clone();
        }
        stored.state = bid.state;
        stored.updated_at = Instant::now();

        Ok(())
    }

    fn select(&self, proposer: &str, chain_id: &str, height: i64) -> Result<Bid, StoreError> {
        let bids = self.bids.read().expect("bid store lock poisoned");
        bids.get(&(proposer.to_string(), chain_id.to_string(), height))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn list(&self) -> Vec<Bid> {
        let bids = self.bids.read().expect("bid store lock poisoned");
        let mut all: Vec<Bid> = bids.values().cloned().collect();
        all.sort_by_key(|b| b.height);
        all
    }

    fn delete(&self, proposer: &str, chain_id: &str, height: i64) -> Result<(), StoreError> {
        let mut bids = self.bids.write().expect("bid store lock poisoned");
        bids.remove(&(proposer.to_string(), chain_id.to_string(), height))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Applies the retention rules to the store.
///
/// - `Pending` bids older than the cutoff never won and are dropped.
/// - `Won` bids not verified within the cutoff point at a stuck verifier;
///   they are dropped with a warning.
/// - `Included` and `Reported` bids are finished and dropped immediately.
pub fn clean_store(store: &dyn BidStore, cutoff_age: Duration) {
    let now = Instant::now();
    let bids = store.list();

    tracing::debug!(bid_count = bids.len(), "cleaning bid store");

    for bid in bids {
        let (proposer, chain_id, height) = bid.key();
        let result = match bid.state {
            BidState::Pending => {
                if now.duration_since(bid.created_at) > cutoff_age {
                    store.delete(&proposer, &chain_id, height)
                } else {
                    Ok(())
                }
            }
            BidState::Won => {
                if now.duration_since(bid.updated_at) > cutoff_age {
                    tracing::warn!(
                        chain_id = %chain_id,
                        height,
                        "winning bid was never verified, maybe a bug? -- deleting"
                    );
                    store.delete(&proposer, &chain_id, height)
                } else {
                    Ok(())
                }
            }
            BidState::Included | BidState::Reported => store.delete(&proposer, &chain_id, height),
        };

        if let Err(err) = result {
            tracing::error!(chain_id = %chain_id, height, err = %err, "cleaning bid failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// A minimal pending bid for tests.
    pub fn dummy_bid(proposer: &str, height: i64) -> Bid {
        let now = Instant::now();
        Bid {
            proposer_address: proposer.to_string(),
            chain_id: "auction-99".to_string(),
            height,
            preference_ids: Vec::new(),
            prefix_hash: vec![1; 32],
            prefix_length: 0,
            segment_hash: vec![2; 32],
            segment_length: 0,
            segment_bytes: 0,
            segment_gas: 0,
            segment_transactions: Vec::new(),
            payment_promise: "250stake".to_string(),
            segment_commitment: None,
            segment_commitment_transaction: Vec::new(),
            created_at: now,
            updated_at: now,
            state: BidState::Pending,
        }
    }
}

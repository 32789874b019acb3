//! Winning-bid selection.
//!
//! The selection policy is a pure function over validated bids, so
//! applications can swap in their own ranking. The default ranks by
//! payment amount, then by transaction count, with a stable sort so the
//! observed bid order breaks any remaining ties deterministically.

use thiserror::Error;

use crate::types::{Builder, Coin};

/// Errors produced by an auction function.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    /// Rejects all bids; the proposer falls back to the default response.
    #[error("auction: rejected all bids, no winner")]
    NoWinner,
}

/// A validated bid as seen by the selection policy.
///
/// Deliberately a separate type from the wire `BidResponse`: by the time a
/// bid reaches selection, its payment has been parsed and its builder
/// resolved.
#[derive(Clone, Debug)]
pub struct AuctionBid {
    /// Chain holding the auction.
    pub chain_id: String,
    /// Height being auctioned.
    pub height: i64,
    /// Preference IDs the bid was solicited under.
    pub preference_ids: Vec<String>,
    /// Builder that produced the bid.
    pub builder: Builder,
    /// Number of transactions in the bid's segment.
    pub transaction_count: i64,
    /// Parsed payment promise. Always a valid coin; the amount can be zero.
    pub payment: Coin,
}

/// Selection policy: picks the index of the winning bid.
pub type AuctionFn = Box<dyn Fn(&[AuctionBid]) -> Result<usize, SelectError> + Send + Sync>;

/// Default policy: highest payment wins, ties broken by higher transaction
/// count, remaining ties by bid arrival order.
pub fn default_auction_func(bids: &[AuctionBid]) -> Result<usize, SelectError> {
    if bids.is_empty() {
        return Err(SelectError::NoWinner);
    }

    let mut order: Vec<usize> = (0..bids.len()).collect();
    order.sort_by(|&i, &j| {
        bids[j]
            .payment
            .amount
            .cmp(&bids[i].payment.amount)
            .then(bids[j].transaction_count.cmp(&bids[i].transaction_count))
    });

    Ok(order[0])
}

//! Bid construction and commitment transaction building.
//!
//! This implementation's bidding policy is deliberately simple: offer a
//! fixed payment promise in the request's denom, with whatever candidate
//! transactions fit under the request limits. By default there are no
//! candidates and the segment is legitimately empty. The policy lives
//! behind one function so richer builders can swap in real transaction
//! selection.

use chain::types::{hash_byte_slices, BidRequest, Coin, Key, Msg, Tx, TxBody, TxError, BASE_DENOM};

use crate::config::ApiConfig;
use crate::node::AccountInfo;
use crate::store::{Bid, BidState};

/// Builds a fresh bid for `req` from candidate segment transactions.
///
/// Candidates are taken in order while they fit the request's byte and gas
/// limits; the rest are dropped. The returned bid is `Pending` and ready
/// for insertion.
pub fn compute_bid(cfg: &ApiConfig, req: &BidRequest, candidate_txs: Vec<Vec<u8>>) -> Bid {
    let mut segment_txs: Vec<Vec<u8>> = Vec::new();
    let mut segment_bytes: i64 = 0;
    let mut segment_gas: i64 = 0;

    for (i, tx_bytes) in candidate_txs.into_iter().enumerate() {
        let tx = match Tx::decode(&tx_bytes) {
            Ok(tx) => tx,
            Err(err) => {
                tracing::warn!(index = i, err = %err, "skipping undecodable candidate tx");
                continue;
            }
        };

        let size = tx_bytes.len() as i64;
        if req.max_bytes > 0 && segment_bytes + size > req.max_bytes {
            break;
        }

        let gas = tx.gas();
        if req.max_gas > 0 && segment_gas + gas > req.max_gas {
            break;
        }

        segment_txs.push(tx_bytes);
        segment_bytes += size;
        segment_gas += gas;
    }

    let now = std::time::Instant::now();
    Bid {
        proposer_address: req.proposer_address.clone(),
        chain_id: req.chain_id.clone(),
        height: req.height,
        preference_ids: req.preference_ids.clone(),
        prefix_hash: hash_byte_slices(&req.prefix_transactions),
        prefix_length: req.prefix_transactions.len() as i64,
        segment_hash: hash_byte_slices(&segment_txs),
        segment_length: segment_txs.len() as i64,
        segment_bytes,
        segment_gas,
        segment_transactions: segment_txs,
        payment_promise: format!("{}{}", cfg.default_payment_amount, req.payment_denom),
        segment_commitment: None,
        segment_commitment_transaction: Vec::new(),
        created_at: now,
        updated_at: now,
        state: BidState::Pending,
    }
}

/// Signs an on-chain transaction carrying the given messages.
///
/// Gas limit and fee are the configured constants; the sequence comes from
/// the account info at the previous height so the transaction is valid for
/// inclusion at the auctioned height.
pub fn build_tx(
    cfg: &ApiConfig,
    key: &Key,
    chain_id: &str,
    account: &AccountInfo,
    messages: Vec<Msg>,
) -> Result<Vec<u8>, TxError> {
    let body = TxBody {
        messages,
        memo: String::new(),
    };

    let tx = Tx::sign(
        key,
        chain_id,
        body,
        account.account_number,
        account.sequence,
        cfg.commit_gas_limit,
        vec![Coin::new(cfg.commit_fee_amount, BASE_DENOM)],
    )?;

    tx.to_bytes()
}

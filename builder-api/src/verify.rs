//! Winning-bid verification and proposer reporting.
//!
//! A commitment is a promise, not a guarantee: the proposer may still
//! propose a block without the committed segment. This loop watches every
//! `Won` bid once its height has passed, checks the commitment transaction
//! actually landed in the auctioned block, and either marks the bid
//! `Included` or reports the proposer on-chain with the doubly-signed
//! commitment as evidence.

use chain::types::{sha256, Key, Msg, MsgReportProposer};

use crate::bidding::build_tx;
use crate::config::ApiConfig;
use crate::node::{Node, NodeError};
use crate::store::{BidState, BidStore};

/// One verification sweep over the store.
pub async fn verify_bids(
    cfg: &ApiConfig,
    store: &dyn BidStore,
    node: &dyn Node,
    builder_key: &Key,
) -> Result<(), NodeError> {
    let current_height = node.current_height().await?;

    tracing::debug!(current_height, "verifying winning bids");

    for mut bid in store.list() {
        if bid.state != BidState::Won {
            continue;
        }

        if current_height < bid.height {
            continue;
        }

        let (proposer, chain_id, height) = bid.key();

        let tx_hash = sha256(&bid.segment_commitment_transaction);
        match node.verify_tx_inclusion(height, &tx_hash).await {
            Ok(()) => {
                bid.state = BidState::Included;
                tracing::info!(proposer = %proposer, chain_id = %chain_id, height, "winning bid verified");
            }
            Err(err) => {
                tracing::warn!(
                    proposer = %proposer,
                    chain_id = %chain_id,
                    height,
                    err = %err,
                    "winning bid verification failed"
                );

                let Some(commitment) = bid.segment_commitment.clone() else {
                    tracing::error!(chain_id = %chain_id, height, "won bid carries no commitment");
                    continue;
                };

                let account = match node.account(current_height, &builder_key.address).await {
                    Ok(account) => account,
                    Err(err) => {
                        tracing::error!(chain_id = %chain_id, height, err = %err, "account info fetch failed");
                        continue;
                    }
                };

                let report_tx = match build_tx(
                    cfg,
                    builder_key,
                    &chain_id,
                    &account,
                    vec![Msg::ReportProposer(MsgReportProposer {
                        builder_address: builder_key.address.clone(),
                        commitment,
                    })],
                ) {
                    Ok(tx) => tx,
                    Err(err) => {
                        tracing::error!(proposer = %proposer, height, err = %err, "report proposer failed");
                        continue;
                    }
                };

                if let Err(err) = node.broadcast_tx(&report_tx).await {
                    tracing::error!(proposer = %proposer, height, err = %err, "report proposer failed");
                    continue;
                }

                tracing::info!(proposer = %proposer, chain_id = %chain_id, height, "reported proposer");
                bid.state = BidState::Reported;
            }
        }

        if let Err(err) = store.update(&bid) {
            tracing::error!(chain_id = %chain_id, height, err = %err, "update bid in store failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testutil::MockNode;
    use crate::node::AccountInfo;
    use crate::store::testutil::dummy_bid;
    use crate::store::MemBidStore;
    use chain::types::{SegmentCommitment, Tx};

    fn won_bid(proposer: &str, height: i64, commitment_tx: &[u8]) -> crate::store::Bid {
        let mut bid = dummy_bid(proposer, height);
        bid.state = BidState::Pending;
        bid.segment_commitment = Some(SegmentCommitment {
            proposer_address: proposer.to_string(),
            chain_id: bid.chain_id.clone(),
            height,
            proposer_signature: vec![1; 64],
            builder_signature: vec![2; 64],
            ..Default::default()
        });
        bid.segment_commitment_transaction = commitment_tx.to_vec();
        bid
    }

    fn store_won_bid(store: &MemBidStore, bid: crate::store::Bid) {
        let mut change = bid.clone();
        store.insert(bid).expect("insert");
        change.state = BidState::Won;
        store.update(&change).expect("update");
    }

    #[tokio::test]
    async fn included_commitment_marks_bid_included() {
        let cfg = ApiConfig::default();
        let builder_key = Key::generate();
        let store = MemBidStore::new();

        let commitment_tx = b"commitment tx bytes".to_vec();
        store_won_bid(&store, won_bid("auc1p", 7, &commitment_tx));

        let mut node = MockNode::new(9);
        node.included_txs.push((7, sha256(&commitment_tx).to_vec()));

        verify_bids(&cfg, &store, &node, &builder_key)
            .await
            .expect("verification sweep");

        let bid = store.select("auc1p", "auction-99", 7).expect("select");
        assert_eq!(bid.state, BidState::Included);
        assert!(node.broadcasts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn missing_commitment_reports_proposer() {
        let cfg = ApiConfig::default();
        let builder_key = Key::generate();
        let store = MemBidStore::new();

        store_won_bid(&store, won_bid("auc1p", 7, b"never included"));

        let node = MockNode::new(9).with_account(
            9,
            &builder_key.address,
            AccountInfo {
                account_number: 1,
                sequence: 5,
            },
        );

        verify_bids(&cfg, &store, &node, &builder_key)
            .await
            .expect("verification sweep");

        let bid = store.select("auc1p", "auction-99", 7).expect("select");
        assert_eq!(bid.state, BidState::Reported);

        let broadcasts = node.broadcasts.lock().expect("lock");
        assert_eq!(broadcasts.len(), 1);

        let report = Tx::decode(&broadcasts[0]).expect("decode report tx");
        match &report.body.messages[..] {
            [Msg::ReportProposer(msg)] => {
                assert_eq!(msg.builder_address, builder_key.address);
                assert_eq!(msg.commitment.proposer_address, "auc1p");
            }
            other => panic!("unexpected messages: {other:?}"),
        }
        assert_eq!(report.auth_info.sequence, 5);
    }

    #[tokio::test]
    async fn future_and_non_won_bids_are_left_alone() {
        let cfg = ApiConfig::default();
        let builder_key = Key::generate();
        let store = MemBidStore::new();

        // Pending bid at a past height: untouched.
        store.insert(dummy_bid("auc1p", 5)).expect("insert");

        // Won bid at a future height: untouched.
        store_won_bid(&store, won_bid("auc1p", 50, b"future"));

        let node = MockNode::new(9);
        verify_bids(&cfg, &store, &node, &builder_key)
            .await
            .expect("verification sweep");

        assert_eq!(
            store.select("auc1p", "auction-99", 5).expect("select").state,
            BidState::Pending
        );
        assert_eq!(
            store.select("auc1p", "auction-99", 50).expect("select").state,
            BidState::Won
        );
        assert!(node.broadcasts.lock().expect("lock").is_empty());
    }
}

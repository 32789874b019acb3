//! `POST /v0/commit`: commitment to a winning bid.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use chain::types::{
    CommitRequest, CommitResponse, Msg, MsgCommitSegment, SegmentCommitment,
};

use crate::bidding::build_tx;
use crate::state::SharedState;
use crate::store::BidState;

use super::{api_error, validate_request, ApiError};

/// Handles the proposer's commitment to this builder's bid.
///
/// The commitment carries the proposer's signature over the canonical
/// commitment form; the builder counter-signs it, wraps it in an on-chain
/// `CommitSegment` transaction signed with its account sequence at the
/// previous height, marks the bid `Won`, and hands back the segment.
pub async fn commit(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CommitResponse>), ApiError> {
    let req: CommitRequest = serde_json::from_slice(&body).map_err(|err| {
        api_error(StatusCode::BAD_REQUEST, format!("decode commit request: {err}"))
    })?;

    tracing::debug!(
        proposer_address = %req.proposer_address,
        chain_id = %req.chain_id,
        height = req.height,
        "commit request"
    );

    validate_request(&state, req.height, &req.proposer_address, |pubkey| {
        req.verify_signature(pubkey)
    })
    .await?;

    let mut bid = state
        .store
        .select(&req.proposer_address, &req.chain_id, req.height)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "commit to unknown bid"))?;

    // The segment data comes from the stored bid, not the request: the
    // bid is the source of truth for what was offered.
    let mut commitment = SegmentCommitment {
        proposer_address: req.proposer_address.clone(),
        builder_address: req.builder_address.clone(),
        chain_id: req.chain_id.clone(),
        height: req.height,
        preference_ids: req.preference_ids.clone(),
        prefix_offset: req.prefix_offset,
        prefix_length: req.prefix_length,
        prefix_hash: req.prefix_hash.clone(),
        segment_offset: req.segment_offset,
        segment_length: req.segment_length,
        segment_bytes: req.segment_bytes,
        segment_gas: req.segment_gas,
        segment_hash: bid.segment_hash.clone(),
        payment_promise: req.payment_promise.clone(),
        proposer_signature: req.signature.clone(),
        builder_signature: Vec::new(),
    };

    commitment.sign_as_builder(&state.key).map_err(|err| {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("sign segment commitment: {err}"))
    })?;

    // The account sequence at H-1 makes the transaction valid for
    // inclusion at H.
    let account = state
        .node
        .account(req.height - 1, &state.key.address)
        .await
        .map_err(|err| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("get builder account sequence: {err}"),
            )
        })?;

    let commitment_tx = build_tx(
        &state.cfg,
        &state.key,
        &req.chain_id,
        &account,
        vec![Msg::CommitSegment(MsgCommitSegment {
            builder_address: state.key.address.clone(),
            commitment: commitment.clone(),
        })],
    )
    .map_err(|err| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("build commitment transaction: {err}"),
        )
    })?;

    bid.segment_commitment = Some(commitment);
    bid.segment_commitment_transaction = commitment_tx.clone();
    bid.state = BidState::Won;

    state
        .store
        .update(&bid)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, format!("update bid in store: {err}")))?;

    let mut res = CommitResponse {
        chain_id: req.chain_id.clone(),
        height: req.height,
        segment_transactions: bid.segment_transactions.clone(),
        segment_commitment_transaction: commitment_tx,
        signature: Vec::new(),
    };
    res.sign_with(&state.key).map_err(|err| {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("sign commit response: {err}"))
    })?;

    Ok((StatusCode::OK, Json(res)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ApiConfig;
    use crate::node::testutil::MockNode;
    use crate::node::AccountInfo;
    use crate::routes::bid::bid;
    use crate::state::AppState;
    use crate::store::MemBidStore;
    use chain::types::{BidRequest, BidResponse, Key, Tx};

    fn shared_state(node: MockNode) -> SharedState {
        Arc::new(AppState {
            key: Key::generate(),
            node: Arc::new(node),
            store: Arc::new(MemBidStore::new()),
            cfg: ApiConfig::default(),
        })
    }

    async fn place_bid(state: &SharedState, proposer_key: &Key) -> (BidRequest, BidResponse) {
        let mut req = BidRequest {
            proposer_address: proposer_key.address.clone(),
            chain_id: "auction-99".to_string(),
            height: 7,
            payment_denom: "stake".to_string(),
            preference_ids: vec!["p1".into()],
            prefix_transactions: vec![b"ptx".to_vec()],
            max_bytes: 1_000_000,
            max_gas: 10_000,
            ..Default::default()
        };
        req.sign_with(proposer_key).expect("sign");

        let body = Bytes::from(serde_json::to_vec(&req).expect("encode"));
        let (_, Json(res)) = bid(State(state.clone()), body).await.expect("bid placed");
        (req, res)
    }

    fn commit_request(proposer_key: &Key, state: &SharedState, bid_res: &BidResponse) -> CommitRequest {
        let mut req = CommitRequest {
            proposer_address: proposer_key.address.clone(),
            builder_address: state.key.address.clone(),
            chain_id: bid_res.chain_id.clone(),
            height: bid_res.height,
            preference_ids: bid_res.preference_ids.clone(),
            prefix_offset: 0,
            prefix_length: 1,
            prefix_hash: bid_res.prefix_hash.clone(),
            segment_offset: 1,
            segment_length: bid_res.segment_length as i32,
            segment_bytes: bid_res.segment_bytes,
            segment_gas: bid_res.segment_gas,
            segment_hash: bid_res.segment_hash.clone(),
            payment_promise: bid_res.payment_promise.clone(),
            ..Default::default()
        };
        req.sign_with(proposer_key).expect("sign");
        req
    }

    #[tokio::test]
    async fn commit_counter_signs_and_builds_transaction() {
        let proposer_key = Key::generate();
        let builder_key = Key::generate();

        // The builder account must be known at H-1.
        let node = MockNode::new(7).with_proposer(6, &proposer_key).with_account(
            6,
            &builder_key.address,
            AccountInfo {
                account_number: 2,
                sequence: 11,
            },
        );
        let state = Arc::new(AppState {
            key: builder_key,
            node: Arc::new(node),
            store: Arc::new(MemBidStore::new()),
            cfg: ApiConfig::default(),
        });

        let (_, bid_res) = place_bid(&state, &proposer_key).await;
        let commit_req = commit_request(&proposer_key, &state, &bid_res);
        let body = Bytes::from(serde_json::to_vec(&commit_req).expect("encode"));

        let (code, Json(res)) = commit(State(state.clone()), body).await.expect("commit succeeds");
        assert_eq!(code, StatusCode::OK);
        assert!(res.verify_signature(&state.key.pub_key));

        // The commitment transaction is a valid single-message commit tx
        // signed by the builder with the H-1 sequence.
        let tx = Tx::decode(&res.segment_commitment_transaction).expect("decode");
        assert_eq!(tx.auth_info.sequence, 11);
        let msg = tx.sole_commit_segment().expect("commit msg");
        assert_eq!(msg.builder_address, state.key.address);
        assert_eq!(msg.commitment.proposer_signature, commit_req.signature);
        msg.commitment
            .verify_signatures(&state.key.pub_key, &proposer_key.pub_key)
            .expect("both signatures valid");

        // Store reflects the won bid.
        let stored = state
            .store
            .select(&proposer_key.address, "auction-99", 7)
            .expect("stored");
        assert_eq!(stored.state, BidState::Won);
        assert_eq!(
            stored.segment_commitment_transaction,
            res.segment_commitment_transaction
        );
    }

    #[tokio::test]
    async fn commit_to_unknown_bid_is_rejected() {
        let proposer_key = Key::generate();
        let node = MockNode::new(7).with_proposer(6, &proposer_key);
        let state = shared_state(node);

        let mut req = CommitRequest {
            proposer_address: proposer_key.address.clone(),
            builder_address: state.key.address.clone(),
            chain_id: "auction-99".to_string(),
            height: 7,
            segment_hash: vec![7; 32],
            payment_promise: "250stake".to_string(),
            ..Default::default()
        };
        req.sign_with(&proposer_key).expect("sign");
        let body = Bytes::from(serde_json::to_vec(&req).expect("encode"));

        let err = commit(State(state), body).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1 .0.error.contains("unknown bid"));
    }
}

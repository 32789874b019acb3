//! `POST /v0/bid`: sealed bids per auction.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use chain::types::{BidRequest, BidResponse};

use crate::bidding::compute_bid;
use crate::state::SharedState;
use crate::store::StoreError;

use super::{api_error, validate_request, ApiError};

/// Handles a proposer's bid solicitation.
///
/// A bid is immutable once placed: the first request for an auction
/// computes and persists it, and every subsequent request for the same
/// `(proposer, chain, height)` gets the identical stored bid back.
pub async fn bid(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BidResponse>), ApiError> {
    let req: BidRequest = serde_json::from_slice(&body)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, format!("parse bid request: {err}")))?;

    tracing::debug!(
        proposer_address = %req.proposer_address,
        chain_id = %req.chain_id,
        height = req.height,
        "bid request"
    );

    validate_request(&state, req.height, &req.proposer_address, |pubkey| {
        req.verify_signature(pubkey)
    })
    .await?;

    let bid = match state
        .store
        .select(&req.proposer_address, &req.chain_id, req.height)
    {
        Ok(bid) => bid,
        Err(StoreError::NotFound) => {
            // This implementation bids an empty segment; richer builders
            // plug real transaction selection in here.
            let bid = compute_bid(&state.cfg, &req, Vec::new());
            state
                .store
                .insert(bid.clone())
                .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("save bid: {err}")))?;
            bid
        }
        Err(err) => {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("lookup bid: {err}"),
            ));
        }
    };

    let mut res = BidResponse {
        proposer_address: bid.proposer_address.clone(),
        chain_id: bid.chain_id.clone(),
        height: bid.height,
        preference_ids: bid.preference_ids.clone(),
        prefix_hash: bid.prefix_hash.clone(),
        payment_promise: bid.payment_promise.clone(),
        segment_length: bid.segment_length,
        segment_bytes: bid.segment_bytes,
        segment_gas: bid.segment_gas,
        segment_hash: bid.segment_hash.clone(),
        signature: Vec::new(),
    };
    res.sign_with(&state.key)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("sign bid response: {err}")))?;

    Ok((StatusCode::OK, Json(res)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ApiConfig;
    use crate::node::testutil::MockNode;
    use crate::state::AppState;
    use crate::store::MemBidStore;
    use chain::types::{hash_byte_slices, Key};

    fn shared_state(node: MockNode) -> SharedState {
        Arc::new(AppState {
            key: Key::generate(),
            node: Arc::new(node),
            store: Arc::new(MemBidStore::new()),
            cfg: ApiConfig::default(),
        })
    }

    fn signed_request(proposer_key: &Key) -> BidRequest {
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
        req
    }

    #[tokio::test]
    async fn returns_signed_immutable_bid() {
        let proposer_key = Key::generate();
        let state = shared_state(MockNode::new(7).with_proposer(6, &proposer_key));
        let req = signed_request(&proposer_key);
        let body = Bytes::from(serde_json::to_vec(&req).expect("encode"));

        let (code, Json(first)) = bid(State(state.clone()), body.clone())
            .await
            .expect("bid succeeds");
        assert_eq!(code, StatusCode::OK);
        assert!(first.verify_signature(&state.key.pub_key));
        assert_eq!(first.prefix_hash, hash_byte_slices(&req.prefix_transactions));
        assert_eq!(first.payment_promise, "250stake");

        // Same auction: identical bid back.
        let (_, Json(second)) = bid(State(state), body).await.expect("bid succeeds");
        assert_eq!(second.get_sign_bytes(), first.get_sign_bytes());
    }

    #[tokio::test]
    async fn rejects_undecodable_body() {
        let proposer_key = Key::generate();
        let state = shared_state(MockNode::new(7).with_proposer(6, &proposer_key));

        let err = bid(State(state), Bytes::from_static(b"not json"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_unknown_proposer() {
        let proposer_key = Key::generate();
        let state = shared_state(MockNode::new(7)); // nobody registered
        let req = signed_request(&proposer_key);
        let body = Bytes::from(serde_json::to_vec(&req).expect("encode"));

        let err = bid(State(state), body).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn rejects_bad_signature() {
        let proposer_key = Key::generate();
        let state = shared_state(MockNode::new(7).with_proposer(6, &proposer_key));

        let mut req = signed_request(&proposer_key);
        req.payment_denom = "atom".to_string(); // invalidates the signature
        let body = Bytes::from(serde_json::to_vec(&req).expect("encode"));

        let err = bid(State(state), body).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);
    }
}

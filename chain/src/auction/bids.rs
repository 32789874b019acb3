//! Bid fan-out and response validation.
//!
//! The engine scatters one signed `BidRequest` to every eligible builder
//! in parallel, collects responses over a channel, and validates each one
//! before it can enter selection. Transport is abstracted behind
//! [`HttpPoster`] so tests can run auctions without a network.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::keeper::BankKeeper;
use crate::types::{
    hash_byte_slices, parse_coin_normalized, BidRequest, BidResponse, Builder, CoinError,
    CommitRequest, CommitResponse, HASH_LEN,
};

use super::select::AuctionBid;

/// Transport-level errors from a builder HTTP call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("execute request: {0}")]
    Request(String),
    #[error("builder response code {0}")]
    Status(u16),
    #[error("builder response exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Errors that disqualify a single builder from the round.
#[derive(Debug, Error)]
pub enum BidError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("decode response: {0}")]
    Decode(String),
    #[error("invalid response signature")]
    Signature,
    #[error("bid chain ID mismatch: want {want:?}, have {have:?}")]
    ChainId { want: String, have: String },
    #[error("bid height mismatch: want {want}, have {have}")]
    Height { want: i64, have: i64 },
    #[error("bid preferences mismatch: want {want:?}, have {have:?}")]
    Preferences { want: Vec<String>, have: Vec<String> },
    #[error("bid prefix hash mismatch")]
    PrefixHash,
    #[error("bid payment promise empty")]
    EmptyPaymentPromise,
    #[error("parse payment promise: {0}")]
    Payment(#[from] CoinError),
    #[error("payment denom: want {want:?}, have {have:?}")]
    PaymentDenom { want: String, have: String },
    #[error("bid segment length invalid: {0}")]
    SegmentLength(i64),
    #[error("bid segment hash size mismatch: want {want}, have {have}")]
    SegmentHashSize { want: usize, have: usize },
    #[error("insufficient builder account balance")]
    InsufficientBalance,
    #[error("empty segment commitment transaction in commit response")]
    EmptySegmentCommitmentTx,
}

/// Minimal async HTTP POST capability.
///
/// The engine only ever POSTs canonical JSON and reads a JSON body back;
/// everything else (TLS, pooling, response caps) is the implementation's
/// business.
#[async_trait]
pub trait HttpPoster: Send + Sync {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

/// [`HttpPoster`] backed by a shared `reqwest` client.
pub struct ReqwestPoster {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl ReqwestPoster {
    pub fn new(max_response_bytes: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_response_bytes,
        }
    }
}

#[async_trait]
impl HttpPoster for ReqwestPoster {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Status(status.as_u16()));
        }

        let mut buf = Vec::new();
        let mut response = response;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?
        {
            if buf.len() + chunk.len() > self.max_response_bytes {
                return Err(TransportError::TooLarge {
                    limit: self.max_response_bytes,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf)
    }
}

/// Joins a builder's base API URL with an endpoint path, avoiding
/// accidental double slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A bid that survived transport, signature, and semantic validation.
pub struct BidTuple {
    pub builder: Builder,
    pub response: BidResponse,
    pub bid: AuctionBid,
}

/// Checks a bid response against the request it answers.
///
/// Everything here is proposer-side defense: a response that fails any
/// check is dropped from the round even if its signature is valid.
pub fn validate_bid_response(req: &BidRequest, res: &BidResponse) -> Result<(), BidError> {
    if res.chain_id != req.chain_id {
        return Err(BidError::ChainId {
            want: req.chain_id.clone(),
            have: res.chain_id.clone(),
        });
    }

    if res.height != req.height {
        return Err(BidError::Height {
            want: req.height,
            have: res.height,
        });
    }

    if res.preference_ids != req.preference_ids {
        return Err(BidError::Preferences {
            want: req.preference_ids.clone(),
            have: res.preference_ids.clone(),
        });
    }

    if res.prefix_hash != hash_byte_slices(&req.prefix_transactions) {
        return Err(BidError::PrefixHash);
    }

    if res.payment_promise.is_empty() {
        return Err(BidError::EmptyPaymentPromise);
    }

    if res.segment_length < 0 {
        return Err(BidError::SegmentLength(res.segment_length));
    }

    if res.segment_hash.len() != HASH_LEN {
        return Err(BidError::SegmentHashSize {
            want: HASH_LEN,
            have: res.segment_hash.len(),
        });
    }

    Ok(())
}

/// Turns a validated response into an [`AuctionBid`], checking payment
/// denomination and builder solvency.
fn postprocess<B: BankKeeper>(
    req: &BidRequest,
    res: &BidResponse,
    builder: &Builder,
    bank: &B,
) -> Result<AuctionBid, BidError> {
    validate_bid_response(req, res)?;

    let payment = parse_coin_normalized(&res.payment_promise)?;

    if payment.denom != req.payment_denom {
        return Err(BidError::PaymentDenom {
            want: req.payment_denom.clone(),
            have: payment.denom,
        });
    }

    let balance = bank.spendable_balance(&builder.address, &payment.denom);
    if payment.amount > balance {
        return Err(BidError::InsufficientBalance);
    }

    Ok(AuctionBid {
        chain_id: req.chain_id.clone(),
        height: req.height,
        preference_ids: req.preference_ids.clone(),
        builder: builder.clone(),
        transaction_count: res.segment_length,
        payment,
    })
}

async fn request_bid(
    poster: Arc<dyn HttpPoster>,
    builder: &Builder,
    body: Vec<u8>,
) -> Result<BidResponse, BidError> {
    let url = endpoint(&builder.builder_api_url, "v0/bid");
    let data = poster.post_json(&url, body).await?;

    let res: BidResponse =
        serde_json::from_slice(&data).map_err(|e| BidError::Decode(e.to_string()))?;

    if !res.verify_signature(&builder.pubkey) {
        return Err(BidError::Signature);
    }

    Ok(res)
}

/// Scatters `req` to all `builders` in parallel and returns the bids that
/// validate. Invalid or failed bids are logged and dropped.
pub async fn gather_bids<B: BankKeeper>(
    builders: Vec<Builder>,
    req: &BidRequest,
    poster: Arc<dyn HttpPoster>,
    bank: &B,
) -> Vec<BidTuple> {
    let body = serde_json::to_vec(req).expect("bid request should serialize");

    let (sender, mut receiver) = mpsc::channel(builders.len().max(1));
    let expected = builders.len();

    for builder in builders {
        let sender = sender.clone();
        let poster = Arc::clone(&poster);
        let body = body.clone();
        tokio::spawn(async move {
            let result = request_bid(poster, &builder, body).await;
            // The receiver only drops on deadline; nothing to do then.
            let _ = sender.send((builder, result)).await;
        });
    }
    drop(sender);

    let mut bids = Vec::new();
    for _ in 0..expected {
        let Some((builder, result)) = receiver.recv().await else {
            break;
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    err = %err,
                    builder_moniker = %builder.moniker,
                    builder_address = %builder.address,
                    "bid failed"
                );
                continue;
            }
        };

        match postprocess(req, &response, &builder, bank) {
            Ok(bid) => {
                tracing::debug!(
                    builder_moniker = %builder.moniker,
                    builder_address = %builder.address,
                    payment_promise = %response.payment_promise,
                    "bid accepted"
                );
                bids.push(BidTuple {
                    builder,
                    response,
                    bid,
                });
            }
            Err(err) => {
                tracing::error!(
                    err = %err,
                    builder_moniker = %builder.moniker,
                    builder_address = %builder.address,
                    "bid invalid"
                );
            }
        }
    }

    bids
}

/// Sends the signed commit request to the winning builder and returns its
/// verified response.
pub async fn send_commit(
    poster: Arc<dyn HttpPoster>,
    builder: &Builder,
    req: &CommitRequest,
) -> Result<CommitResponse, BidError> {
    let body = serde_json::to_vec(req).expect("commit request should serialize");
    let url = endpoint(&builder.builder_api_url, "v0/commit");

    let data = poster.post_json(&url, body).await?;
    let res: CommitResponse =
        serde_json::from_slice(&data).map_err(|e| BidError::Decode(e.to_string()))?;

    if !res.verify_signature(&builder.pubkey) {
        return Err(BidError::Signature);
    }

    if res.segment_commitment_transaction.is_empty() {
        return Err(BidError::EmptySegmentCommitmentTx);
    }

    Ok(res)
}

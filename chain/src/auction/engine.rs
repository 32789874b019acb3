//! The proposer-side auction engine.
//!
//! [`AuctionEngine`] drives one auction per proposed block: it solicits
//! bids from eligible builders, selects a winner, commits to the winning
//! bid, assembles the block, and validates the embedded commitment. Every
//! failure along the way degrades to the *default response* (the request
//! mempool with commitment-bearing transactions filtered out), so a broken
//! auction can never delay or corrupt a proposal.
//!
//! The whole auction runs under a wall-clock deadline well below the
//! consensus proposal timeout. Results are memoized by height so a restart
//! of the proposal round replays the same answer.
//!
//! Like the rest of the state-machine surface, the engine borrows the
//! keeper and bank at call time rather than owning them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::keeper::{BankKeeper, Keeper};
use crate::metrics::MetricsRegistry;
use crate::store::KvStore;
use crate::types::commitment::CommitmentError;
use crate::types::{
    BidRequest, CommitRequest, Context, Key, PrepareProposalRequest, PrepareProposalResponse,
    ProcessProposalRequest, ProcessProposalResponse, ProposalStatus, Tx, BASE_DENOM,
};

use super::assembly::block_transactions;
use super::bids::{gather_bids, send_commit, HttpPoster};
use super::preferences::Preferences;
use super::select::{default_auction_func, AuctionFn};

/// Tuning knobs for the auction engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Wall-clock budget for the entire auction. Must be well below the
    /// consensus-level prepare timeout.
    pub prepare_timeout: Duration,
    /// Cap on a single builder HTTP response body.
    pub max_response_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prepare_timeout: Duration::from_secs(3),
            max_response_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Computes the prefix region from the request mempool.
pub type PrefixFn = Box<dyn Fn(&Context, &[Vec<u8>]) -> Result<Vec<Vec<u8>>, String> + Send + Sync>;

/// Simulates a transaction against current state, failing if it would not
/// execute.
pub type SimulateFn = Box<dyn Fn(&[u8]) -> Result<(), String> + Send + Sync>;

/// Errors found while validating a block's segment commitment.
#[derive(Debug, Error)]
pub enum ValidateCommitmentError {
    #[error("invalid position in block: want {want}, have {have}")]
    Position { want: i32, have: i32 },
    #[error("segment commitment signer: want {want:?}, have {have:?}")]
    Signer { want: String, have: String },
    #[error("no segment commitment found in block")]
    Missing,
    #[error("simulation failed: {0}")]
    Simulation(String),
    #[error("verify block hashes: {0}")]
    BlockHashes(#[from] CommitmentError),
    #[error("preference {0:?} is unknown")]
    UnknownPreference(String),
    #[error("preference {id:?} validation error: {err}")]
    Preference { id: String, err: String },
}

/// Arguments to [`AuctionEngine::validate_commitment`].
pub struct ValidateCommitmentConfig<'a> {
    pub block_txs: &'a [Vec<u8>],
    /// If `true`, a missing segment commitment is an error.
    pub required: bool,
    /// Optional; if non-empty, compared with the commitment tx's signer.
    pub signer_addr: &'a str,
    /// Optional; if provided, called with the commitment's tx bytes.
    pub simulate: Option<&'a SimulateFn>,
}

/// Removes any transactions containing `CommitSegment` messages from the
/// given list. Transactions that fail to decode are dropped as well.
pub fn filter_commit_segment_txs(txs: &[Vec<u8>]) -> Vec<Vec<u8>> {
    txs.iter()
        .filter(|tx_bytes| match Tx::decode(tx_bytes) {
            Ok(tx) => !tx.contains_commit_segment(),
            Err(_) => false,
        })
        .cloned()
        .collect()
}

/// The proposer-side auction engine.
pub struct AuctionEngine {
    cfg: EngineConfig,
    proposer_key: Key,
    preferences: Preferences,
    auction_fn: AuctionFn,
    prefix_fn: PrefixFn,
    poster: Arc<dyn HttpPoster>,
    metrics: Option<Arc<MetricsRegistry>>,
    memoized: HashMap<i64, PrepareProposalResponse>,
}

impl AuctionEngine {
    /// Creates an engine with the default selection policy and an empty
    /// prefix.
    pub fn new(
        cfg: EngineConfig,
        proposer_key: Key,
        preferences: Preferences,
        poster: Arc<dyn HttpPoster>,
    ) -> Self {
        Self {
            cfg,
            proposer_key,
            preferences,
            auction_fn: Box::new(default_auction_func),
            prefix_fn: Box::new(|_, _| Ok(Vec::new())),
            poster,
            metrics: None,
            memoized: HashMap::new(),
        }
    }

    /// Replaces the selection policy.
    pub fn with_auction_fn(mut self, auction_fn: AuctionFn) -> Self {
        self.auction_fn = auction_fn;
        self
    }

    /// Replaces the prefix policy.
    pub fn with_prefix_fn(mut self, prefix_fn: PrefixFn) -> Self {
        self.prefix_fn = prefix_fn;
        self
    }

    /// Attaches a metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The address of the key this engine signs bid requests with.
    pub fn proposer_address(&self) -> &str {
        &self.proposer_key.address
    }

    /// Runs the auction for one block proposal.
    ///
    /// Results are memoized by height (proposer and chain are implicit for
    /// a single process); entries older than `height - 1` are evicted on
    /// each call. On any error or on deadline, the default response is
    /// returned.
    pub async fn prepare_proposal<S: KvStore, B: BankKeeper>(
        &mut self,
        ctx: &Context,
        keeper: &Keeper<S>,
        bank: &B,
        req: &PrepareProposalRequest,
        simulate: Option<&SimulateFn>,
    ) -> PrepareProposalResponse {
        let height = req.height;
        self.memoized.retain(|&h, _| h >= height - 1);

        if let Some(res) = self.memoized.get(&height) {
            return res.clone();
        }

        let started = std::time::Instant::now();

        let default_response = PrepareProposalResponse {
            txs: filter_commit_segment_txs(&req.txs),
        };

        let outcome = tokio::time::timeout(
            self.cfg.prepare_timeout,
            self.run_auction(ctx, keeper, bank, req, simulate),
        )
        .await;

        let res = match outcome {
            Ok(Some(txs)) => PrepareProposalResponse { txs },
            Ok(None) => {
                if let Some(m) = &self.metrics {
                    m.auction.auctions_defaulted.inc();
                }
                default_response
            }
            Err(_) => {
                tracing::error!(height, "auction deadline exceeded, using default response");
                if let Some(m) = &self.metrics {
                    m.auction.auctions_defaulted.inc();
                }
                default_response
            }
        };

        if let Some(m) = &self.metrics {
            m.auction
                .auction_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        self.memoized.insert(height, res.clone());
        res
    }

    /// One full auction. Returns `None` wherever the proposer must fall
    /// back to the default response; every bail point logs its reason.
    async fn run_auction<S: KvStore, B: BankKeeper>(
        &self,
        ctx: &Context,
        keeper: &Keeper<S>,
        bank: &B,
        req: &PrepareProposalRequest,
        simulate: Option<&SimulateFn>,
    ) -> Option<Vec<Vec<u8>>> {
        let height = req.height;
        tracing::debug!(
            height,
            chain_id = %ctx.chain_id,
            max_tx_bytes = req.max_tx_bytes,
            txs_count = req.txs.len(),
            proposer_address = %req.proposer_address,
            "starting auction"
        );

        // The first proposal after startup can carry an empty chain ID.
        if ctx.chain_id.is_empty() {
            tracing::error!(height, "prepare proposal called with empty chain ID");
            return None;
        }

        // Only registered proposers run auctions.
        let Some(proposer) = keeper.proposer(&self.proposer_key.address) else {
            tracing::info!(height, "proposer isn't registered");
            return None;
        };

        let builders = keeper.auction_builders(ctx);
        if builders.is_empty() {
            tracing::info!(height, "not soliciting bids, no allowed builders");
            return None;
        }

        // Prefix transactions come first in the block, before the winning
        // segment. Commitment-bearing transactions can only exist in the
        // commit transaction we request ourselves, so strip them from both
        // the prefix and the mempool.
        let prefix_transactions = match (self.prefix_fn)(ctx, &req.txs) {
            Ok(txs) => filter_commit_segment_txs(&txs),
            Err(err) => {
                tracing::error!(height, err = %err, "error getting prefix txs");
                return None;
            }
        };
        let mempool_transactions = filter_commit_segment_txs(&req.txs);

        let mut bid_request = BidRequest {
            proposer_address: self.proposer_key.address.clone(),
            chain_id: ctx.chain_id.clone(),
            height,
            payment_denom: BASE_DENOM.to_string(),
            preference_ids: self.preferences.ids(),
            prefix_transactions: prefix_transactions.clone(),
            max_bytes: req.max_tx_bytes,
            max_gas: req.max_gas,
            signature: Vec::new(),
        };
        if let Err(err) = bid_request.sign_with(&self.proposer_key) {
            tracing::error!(height, err = %err, "error signing bid request");
            return None;
        }

        tracing::debug!(
            height,
            proposer_address = %proposer.address,
            builder_count = builders.len(),
            signature = %hex::encode(&bid_request.signature),
            "signed bid request"
        );

        let bids = gather_bids(builders, &bid_request, Arc::clone(&self.poster), bank).await;
        if let Some(m) = &self.metrics {
            m.auction.bids_received.inc_by(bids.len() as u64);
        }
        if bids.is_empty() {
            tracing::error!(height, "no successful bids");
            return None;
        }

        let auction_bids: Vec<_> = bids.iter().map(|t| t.bid.clone()).collect();
        let winner = match (self.auction_fn)(&auction_bids) {
            Ok(index) => &bids[index],
            Err(err) => {
                tracing::error!(height, err = %err, "error choosing winning bid");
                return None;
            }
        };

        tracing::debug!(
            height,
            builder_moniker = %winner.builder.moniker,
            builder_address = %winner.builder.address,
            payment = %winner.bid.payment,
            "selected winning bid"
        );

        // Commit to the winning bid. The builder answers with the segment
        // transactions and the counter-signed commitment transaction.
        let mut commit_request = CommitRequest {
            proposer_address: self.proposer_key.address.clone(),
            builder_address: winner.builder.address.clone(),
            chain_id: winner.response.chain_id.clone(),
            height: winner.response.height,
            preference_ids: winner.response.preference_ids.clone(),
            prefix_offset: 0,
            prefix_length: prefix_transactions.len() as i32,
            prefix_hash: winner.response.prefix_hash.clone(),
            segment_offset: prefix_transactions.len() as i32,
            segment_length: winner.response.segment_length as i32,
            segment_bytes: winner.response.segment_bytes,
            segment_gas: winner.response.segment_gas,
            segment_hash: winner.response.segment_hash.clone(),
            payment_promise: winner.response.payment_promise.clone(),
            signature: Vec::new(),
        };
        if let Err(err) = commit_request.sign_with(&self.proposer_key) {
            tracing::error!(height, err = %err, "error signing commit request");
            return None;
        }

        let commitment = match send_commit(
            Arc::clone(&self.poster),
            &winner.builder,
            &commit_request,
        )
        .await
        {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(height, err = %err, "error making commitment to winning builder");
                return None;
            }
        };

        tracing::debug!(
            height,
            tx_count = commitment.segment_transactions.len(),
            commitment_tx_len = commitment.segment_commitment_transaction.len(),
            "got bid segment"
        );

        let block_txs = match block_transactions(
            bid_request.max_bytes,
            bid_request.max_gas,
            &prefix_transactions,
            &commitment.segment_transactions,
            &commitment.segment_commitment_transaction,
            &mempool_transactions,
        ) {
            Ok(txs) => txs,
            Err(err) => {
                tracing::error!(height, err = %err, "error computing block transactions");
                return None;
            }
        };

        // The tentative block must satisfy the semantic rules described by
        // the commitment before we propose it.
        if let Err(err) = self.validate_commitment(ValidateCommitmentConfig {
            block_txs: &block_txs,
            required: true,
            signer_addr: &winner.builder.address,
            simulate,
        }) {
            tracing::error!(height, err = %err, "error validating proposal txs");
            return None;
        }

        if let Some(m) = &self.metrics {
            m.auction.winning_payment.set(winner.bid.payment.amount as f64);
        }

        tracing::debug!(height, n = block_txs.len(), "computed block transactions");

        Some(block_txs)
    }

    /// Validates a candidate block on every validator.
    ///
    /// A block without a commitment is acceptable; a block with an invalid
    /// one is rejected.
    pub fn process_proposal(
        &self,
        req: &ProcessProposalRequest,
        simulate: Option<&SimulateFn>,
    ) -> ProcessProposalResponse {
        tracing::debug!(height = req.height, tx_count = req.txs.len(), "validating block");

        if let Err(err) = self.validate_commitment(ValidateCommitmentConfig {
            block_txs: &req.txs,
            required: false,
            signer_addr: "",
            simulate,
        }) {
            tracing::error!(height = req.height, err = %err, "error validating proposal txs");
            return ProcessProposalResponse {
                status: ProposalStatus::Reject,
            };
        }

        ProcessProposalResponse {
            status: ProposalStatus::Accept,
        }
    }

    /// Finds and validates the block's segment commitment.
    pub fn validate_commitment(
        &self,
        cfg: ValidateCommitmentConfig<'_>,
    ) -> Result<(), ValidateCommitmentError> {
        let mut found: Option<(crate::types::MsgCommitSegment, &[u8])> = None;

        for (i, tx_bytes) in cfg.block_txs.iter().enumerate() {
            let Ok(tx) = Tx::decode(tx_bytes) else {
                continue;
            };

            let Some(msg) = tx.sole_commit_segment() else {
                continue;
            };

            let have = i as i32;
            let want = msg.commitment.segment_offset + msg.commitment.segment_length;
            if want != have {
                return Err(ValidateCommitmentError::Position { want, have });
            }

            // The envelope carries exactly one signature; it must belong
            // to the expected builder when one is named.
            let signer = tx.signer_address();
            if !cfg.signer_addr.is_empty() && cfg.signer_addr != signer {
                return Err(ValidateCommitmentError::Signer {
                    want: cfg.signer_addr.to_string(),
                    have: signer,
                });
            }

            found = Some((msg.clone(), tx_bytes));
            break;
        }

        let Some((msg, commit_tx)) = found else {
            if cfg.required {
                return Err(ValidateCommitmentError::Missing);
            }
            return Ok(());
        };

        if let Some(simulate) = cfg.simulate {
            simulate(commit_tx).map_err(ValidateCommitmentError::Simulation)?;
        }

        msg.commitment.verify_block_hashes(cfg.block_txs)?;

        for id in &msg.commitment.preference_ids {
            let Some(preference) = self.preferences.get(id) else {
                return Err(ValidateCommitmentError::UnknownPreference(id.clone()));
            };
            (preference.validate)(cfg.block_txs).map_err(|err| {
                ValidateCommitmentError::Preference {
                    id: id.clone(),
                    err,
                }
            })?;
        }

        Ok(())
    }
}

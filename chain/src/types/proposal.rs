//! Block-proposal request/response shapes and the execution context.
//!
//! These mirror the consensus engine's hooks into the application: the
//! designated proposer receives a `PrepareProposal` call with the mempool
//! contents and limits, and every validator receives a `ProcessProposal`
//! call with the candidate block.

/// Execution context threaded through state-machine code.
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub chain_id: String,
    pub block_height: i64,
    /// Block time, seconds since Unix epoch. Observability only.
    pub block_time: u64,
}

impl Context {
    pub fn new(chain_id: impl Into<String>, block_height: i64) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            block_time: 0,
        }
    }
}

/// Request handed to the designated proposer for height `height`.
#[derive(Clone, Debug, Default)]
pub struct PrepareProposalRequest {
    pub height: i64,
    /// Mempool transactions, in the consensus engine's preferred order.
    pub txs: Vec<Vec<u8>>,
    /// Upper bound on total transaction bytes in the proposal.
    pub max_tx_bytes: i64,
    /// Upper bound on total gas in the proposal; non-positive means none.
    pub max_gas: i64,
    /// Consensus identity of the proposer; used for logging only.
    pub proposer_address: String,
    /// Wall-clock time of the proposal, seconds since Unix epoch.
    pub time: u64,
}

/// The transactions the proposer wants in the block, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrepareProposalResponse {
    pub txs: Vec<Vec<u8>>,
}

/// Request handed to every validator to vet a candidate block.
#[derive(Clone, Debug, Default)]
pub struct ProcessProposalRequest {
    pub height: i64,
    pub txs: Vec<Vec<u8>>,
}

/// Whether a validator accepts the candidate block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalStatus {
    Accept,
    Reject,
}

/// Response to a `ProcessProposal` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessProposalResponse {
    pub status: ProposalStatus,
}

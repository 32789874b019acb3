//! Trusted-node client and cache.
//!
//! The builder never trusts incoming requests on their own: every bid and
//! commit request is validated against the view of a trusted full node.
//! [`Node`] abstracts that view; [`HttpNode`] implements it over the
//! node's JSON API, and [`CachedNode`] keeps a mutex-guarded cache of the
//! proposers around the chain tip and of tracked accounts, refreshed by
//! background loops so request handling never waits on the node.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use chain::types::Proposer;

/// Errors produced by trusted-node queries.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node URL: {0}")]
    Url(String),
    #[error("node request: {0}")]
    Transport(String),
    #[error("node response code {0}")]
    Status(u16),
    #[error("node response: {0}")]
    Protocol(String),
    #[error("node is catching up")]
    CatchingUp,
    #[error("proposers for height {0} not cached")]
    ProposersNotCached(i64),
    #[error("proposer {addr} does not exist in cached height {height}")]
    ProposerNotCached { height: i64, addr: String },
    #[error("account {addr} at height {height} not cached")]
    AccountNotCached { height: i64, addr: String },
    #[error("tx {hash} not found at height {height}")]
    TxNotFound { height: i64, hash: String },
    #[error("tx {hash} found at height {have}, want {want}")]
    TxWrongHeight { hash: String, have: i64, want: i64 },
}

/// Account number and sequence as of some height.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// The staking status of a proposer's backing validator.
#[derive(Clone, Debug, Deserialize)]
pub struct ValidatorStatus {
    pub bonded: bool,
    pub jailed: bool,
}

/// A registered proposer together with its validator's status.
#[derive(Clone, Debug, Deserialize)]
pub struct ProposerView {
    pub proposer: Proposer,
    pub validator: Option<ValidatorStatus>,
}

/// Read access to a trusted node.
#[async_trait]
pub trait Node: Send + Sync {
    /// Height of the latest committed block.
    async fn current_height(&self) -> Result<i64, NodeError>;

    /// All registered proposers as of `height`.
    async fn proposers(&self, height: i64) -> Result<Vec<Proposer>, NodeError>;

    /// One proposer with validator status, as of `height`.
    async fn proposer(&self, height: i64, addr: &str) -> Result<ProposerView, NodeError>;

    /// Account info for `addr` as of `height`.
    async fn account(&self, height: i64, addr: &str) -> Result<AccountInfo, NodeError>;

    /// Succeeds only if the tx with `tx_hash` was included at `height`.
    async fn verify_tx_inclusion(&self, height: i64, tx_hash: &[u8]) -> Result<(), NodeError>;

    /// Fire-and-forget broadcast of a signed transaction.
    async fn broadcast_tx(&self, tx: &[u8]) -> Result<(), NodeError>;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
    catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct ProposersResponse {
    proposers: Vec<Proposer>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    height: String,
}

/// [`Node`] implementation over the trusted node's JSON HTTP API.
pub struct HttpNode {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNode {
    /// Connects to the node at `base_url` and pings it, refusing nodes
    /// that are still catching up.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self, NodeError> {
        let url = reqwest::Url::parse(base_url).map_err(|e| NodeError::Url(e.to_string()))?;
        let base_url = format!(
            "{}://{}",
            url.scheme(),
            url.authority()
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let node = Self { base_url, client };
        node.ping().await?;
        Ok(node)
    }

    async fn ping(&self) -> Result<(), NodeError> {
        let status: StatusResponse = self.get_json("/status").await?;
        if status.sync_info.catching_up {
            return Err(NodeError::CatchingUp);
        }
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, NodeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| NodeError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl Node for HttpNode {
    async fn current_height(&self) -> Result<i64, NodeError> {
        let status: StatusResponse = self.get_json("/status").await?;
        if status.sync_info.catching_up {
            return Err(NodeError::CatchingUp);
        }
        status
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|e| NodeError::Protocol(format!("latest block height: {e}")))
    }

    async fn proposers(&self, height: i64) -> Result<Vec<Proposer>, NodeError> {
        let res: ProposersResponse = self
            .get_json(&format!("/auction/proposers?height={height}"))
            .await?;
        Ok(res.proposers)
    }

    async fn proposer(&self, height: i64, addr: &str) -> Result<ProposerView, NodeError> {
        self.get_json(&format!("/auction/proposers/{addr}?height={height}"))
            .await
    }

    async fn account(&self, height: i64, addr: &str) -> Result<AccountInfo, NodeError> {
        self.get_json(&format!("/auth/accounts/{addr}?height={height}"))
            .await
    }

    async fn verify_tx_inclusion(&self, height: i64, tx_hash: &[u8]) -> Result<(), NodeError> {
        let hash = hex::encode(tx_hash);
        let res: TxResponse = match self.get_json(&format!("/txs/{hash}")).await {
            Ok(res) => res,
            Err(NodeError::Status(404)) => {
                return Err(NodeError::TxNotFound { height, hash });
            }
            Err(e) => return Err(e),
        };

        let have: i64 = res
            .height
            .parse()
            .map_err(|e| NodeError::Protocol(format!("tx height: {e}")))?;
        if have != height {
            return Err(NodeError::TxWrongHeight {
                hash,
                have,
                want: height,
            });
        }

        Ok(())
    }

    async fn broadcast_tx(&self, tx: &[u8]) -> Result<(), NodeError> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let url = format!("{}/txs", self.base_url);
        let body = serde_json::json!({ "tx": STANDARD.encode(tx) });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[derive(Default)]
struct CacheState {
    proposers: HashMap<i64, HashMap<String, ProposerView>>,
    accounts: HashMap<(i64, String), AccountInfo>,
    proposers_ready: bool,
    accounts_ready: bool,
}

/// [`Node`] wrapper serving proposer and account lookups from a local
/// cache.
///
/// The cache holds proposers for the heights around the chain tip
/// (`H-1..=H`) and the accounts of tracked addresses. Background loops
/// call [`CachedNode::refresh_proposers`] and
/// [`CachedNode::refresh_accounts`]; lookups for anything not cached fail
/// rather than fall through, keeping request latency bounded.
pub struct CachedNode<N: Node> {
    inner: N,
    tracked_addrs: Vec<String>,
    state: Mutex<CacheState>,
}

impl<N: Node> CachedNode<N> {
    pub fn new(inner: N, tracked_addrs: Vec<String>) -> Self {
        Self {
            inner,
            tracked_addrs,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Re-fetches proposers for heights `H-1..=H`.
    pub async fn refresh_proposers(&self) -> Result<(), NodeError> {
        let current_height = self.inner.current_height().await?;

        let mut nextgen: HashMap<i64, HashMap<String, ProposerView>> = HashMap::new();
        for height in (current_height - 1)..=current_height {
            let proposers = self.inner.proposers(height).await?;

            let mut index = HashMap::new();
            for p in proposers {
                let view = self.inner.proposer(height, &p.address).await?;
                index.insert(p.address.clone(), view);
            }
            nextgen.insert(height, index);
        }

        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.proposers = nextgen;
        state.proposers_ready = true;
        Ok(())
    }

    /// Re-fetches tracked accounts at the current height.
    pub async fn refresh_accounts(&self) -> Result<(), NodeError> {
        let current_height = self.inner.current_height().await?;

        let mut nextgen = HashMap::new();
        for addr in &self.tracked_addrs {
            let info = self.inner.account(current_height, addr).await?;
            nextgen.insert((current_height, addr.clone()), info);
        }

        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.accounts = nextgen;
        state.accounts_ready = true;
        Ok(())
    }

    /// Resolves once both caches have been populated at least once.
    pub async fn wait_until_ready(&self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            ticker.tick().await;
            let state = self.state.lock().expect("cache mutex poisoned");
            if state.proposers_ready && state.accounts_ready {
                return;
            }
        }
    }
}

#[async_trait]
impl<N: Node> Node for CachedNode<N> {
    async fn current_height(&self) -> Result<i64, NodeError> {
        self.inner.current_height().await
    }

    async fn proposers(&self, height: i64) -> Result<Vec<Proposer>, NodeError> {
        self.inner.proposers(height).await
    }

    async fn proposer(&self, height: i64, addr: &str) -> Result<ProposerView, NodeError> {
        let state = self.state.lock().expect("cache mutex poisoned");

        let proposers = state
            .proposers
            .get(&height)
            .ok_or(NodeError::ProposersNotCached(height))?;

        proposers
            .get(addr)
            .cloned()
            .ok_or_else(|| NodeError::ProposerNotCached {
                height,
                addr: addr.to_string(),
            })
    }

    async fn account(&self, height: i64, addr: &str) -> Result<AccountInfo, NodeError> {
        let state = self.state.lock().expect("cache mutex poisoned");

        state
            .accounts
            .get(&(height, addr.to_string()))
            .cloned()
            .ok_or_else(|| NodeError::AccountNotCached {
                height,
                addr: addr.to_string(),
            })
    }

    async fn verify_tx_inclusion(&self, height: i64, tx_hash: &[u8]) -> Result<(), NodeError> {
        self.inner.verify_tx_inclusion(height, tx_hash).await
    }

    async fn broadcast_tx(&self, tx: &[u8]) -> Result<(), NodeError> {
        self.inner.broadcast_tx(tx).await
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use chain::types::Key;

    /// Scriptable in-memory [`Node`] for tests.
    pub struct MockNode {
        pub height: i64,
        pub views: HashMap<(i64, String), ProposerView>,
        pub accounts: HashMap<(i64, String), AccountInfo>,
        pub included_txs: Vec<(i64, Vec<u8>)>,
        pub broadcasts: StdMutex<Vec<Vec<u8>>>,
    }

    impl MockNode {
        pub fn new(height: i64) -> Self {
            Self {
                height,
                views: HashMap::new(),
                accounts: HashMap::new(),
                included_txs: Vec::new(),
                broadcasts: StdMutex::new(Vec::new()),
            }
        }

        /// Registers a bonded, unjailed proposer at `height`.
        pub fn with_proposer(mut self, height: i64, key: &Key) -> Self {
            let operator = Key::generate();
            let view = ProposerView {
                proposer: Proposer {
                    address: key.address.clone(),
                    pubkey: key.pub_key.clone(),
                    operator_address: operator.pub_key.operator_address(),
                    operator_pubkey: operator.pub_key,
                },
                validator: Some(ValidatorStatus {
                    bonded: true,
                    jailed: false,
                }),
            };
            self.views.insert((height, key.address.clone()), view);
            self
        }

        pub fn with_account(mut self, height: i64, addr: &str, info: AccountInfo) -> Self {
            self.accounts.insert((height, addr.to_string()), info);
            self
        }
    }

    #[async_trait]
    impl Node for MockNode {
        async fn current_height(&self) -> Result<i64, NodeError> {
            Ok(self.height)
        }

        async fn proposers(&self, height: i64) -> Result<Vec<Proposer>, NodeError> {
            Ok(self
                .views
                .iter()
                .filter(|((h, _), _)| *h == height)
                .map(|(_, v)| v.proposer.clone())
                .collect())
        }

        async fn proposer(&self, height: i64, addr: &str) -> Result<ProposerView, NodeError> {
            self.views
                .get(&(height, addr.to_string()))
                .cloned()
                .ok_or_else(|| NodeError::ProposerNotCached {
                    height,
                    addr: addr.to_string(),
                })
        }

        async fn account(&self, height: i64, addr: &str) -> Result<AccountInfo, NodeError> {
            self.accounts
                .get(&(height, addr.to_string()))
                .cloned()
                .ok_or_else(|| NodeError::AccountNotCached {
                    height,
                    addr: addr.to_string(),
                })
        }

        async fn verify_tx_inclusion(&self, height: i64, tx_hash: &[u8]) -> Result<(), NodeError> {
            if self
                .included_txs
                .iter()
                .any(|(h, hash)| *h == height && hash.as_slice() == tx_hash)
            {
                return Ok(());
            }
            Err(NodeError::TxNotFound {
                height,
                hash: hex::encode(tx_hash),
            })
        }

        async fn broadcast_tx(&self, tx: &[u8]) -> Result<(), NodeError> {
            self.broadcasts
                .lock()
                .expect("broadcast mutex poisoned")
                .push(tx.to_vec());
            Ok(())
        }
    }
}

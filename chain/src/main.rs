// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - RocksDB-backed keeper state
// - In-memory bank and staking stand-ins
// - Auction engine with the reqwest transport
// - Prometheus metrics exporter on /metrics
// - Simple loop that runs one auction per block at a fixed interval.
//
// Without registered builders every auction falls back to the default
// response; point registered builders at a running `builder-api` to see
// full auctions.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chain::{
    auction::end_block, keeper::genesis::init_genesis, serve_metrics, AuctionEngine, ChainConfig,
    Coin, Context, GenesisState, Key, Keeper, MemBank, MemStaking, MetricsRegistry,
    PrepareProposalRequest, Preferences, ProcessProposalRequest, ProposalStatus, Proposer,
    ReqwestPoster, RocksDbKvStore, Validator,
};

const CHAIN_ID: &str = "auction-demo";
const BLOCK_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "chain=info".to_string()))
        .init();

    if let Err(err) = run_node().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    let cfg = ChainConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if let Some(addr) = cfg.metrics.listen_addr {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(metrics_clone, addr).await {
                tracing::error!(err = %e, "metrics HTTP server error");
            }
        });
    }

    // ---------------------------
    // Storage + keeper
    // ---------------------------

    let store = RocksDbKvStore::open(&cfg.storage)
        .map_err(|e| format!("failed to open RocksDB store at {}: {e}", cfg.storage.path))?;

    let authority = Key::generate();
    let mut keeper = Keeper::new(store, authority.address.clone());
    init_genesis(&mut keeper, GenesisState::default())
        .map_err(|e| format!("failed to initialise genesis state: {e}"))?;

    // ---------------------------
    // Proposer identity
    // ---------------------------

    let proposer_key = Key::load_or_generate(&cfg.proposer_key.key_file)
        .map_err(|e| format!("failed to load proposer key: {e}"))?;
    tracing::info!(address = %proposer_key.address, "proposer key loaded");

    // Demo-only stand-ins for the bank and staking modules, with the
    // proposer registered under a fresh operator key.
    let mut bank = MemBank::new();
    let mut staking = MemStaking::new();

    let operator_key = Key::generate();
    staking.add_validator(Validator {
        operator_address: operator_key.pub_key.operator_address(),
        bonded: true,
        jailed: false,
    });
    bank.set_balance(&proposer_key.address, Coin::new(1_000_000, "stake"));

    if keeper.proposer(&proposer_key.address).is_none() {
        keeper.set_proposer(&Proposer {
            address: proposer_key.address.clone(),
            pubkey: proposer_key.pub_key.clone(),
            operator_address: operator_key.pub_key.operator_address(),
            operator_pubkey: operator_key.pub_key.clone(),
        });
    }

    // ---------------------------
    // Auction engine
    // ---------------------------

    let poster = Arc::new(ReqwestPoster::new(cfg.engine.max_response_bytes));
    let mut engine = AuctionEngine::new(
        cfg.engine.clone(),
        proposer_key,
        Preferences::default(),
        poster,
    )
    .with_metrics(metrics.clone());

    tracing::info!(
        block_interval_secs = BLOCK_INTERVAL_SECS,
        "starting demo proposal loop (empty mempool)"
    );

    // ---------------------------
    // Main proposal loop
    // ---------------------------

    let mut height: i64 = 1;
    loop {
        let ctx = Context {
            chain_id: CHAIN_ID.to_string(),
            block_height: height,
            block_time: current_unix_timestamp(),
        };

        let req = PrepareProposalRequest {
            height,
            txs: Vec::new(),
            max_tx_bytes: 1_000_000,
            max_gas: 10_000_000,
            proposer_address: engine.proposer_address().to_string(),
            time: ctx.block_time,
        };

        let res = engine.prepare_proposal(&ctx, &keeper, &bank, &req, None).await;

        let process = engine.process_proposal(
            &ProcessProposalRequest {
                height,
                txs: res.txs.clone(),
            },
            None,
        );
        if process.status != ProposalStatus::Accept {
            tracing::warn!(height, "own proposal failed process-proposal validation");
        }

        // A real node executes the block's messages here via `MsgServer`
        // before closing the block out.
        end_block(&ctx, &mut keeper, &mut bank, None);

        tracing::info!(height, tx_count = res.txs.len(), "proposed block");

        height += 1;
        tokio::time::sleep(Duration::from_secs(BLOCK_INTERVAL_SECS)).await;
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

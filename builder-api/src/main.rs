// builder-api/src/main.rs

//! Builder API binary.
//!
//! This binary exposes the builder side of the block auction protocol on
//! top of the `chain` crate:
//!
//! - `POST /v0/bid`
//! - `POST /v0/commit`
//! - `GET /health`
//!
//! It embeds the bid store, a cached trusted-node client with background
//! refresh loops, a store cleaner, and the winning-bid verifier that
//! reports proposers who drop committed segments.

mod bidding;
mod config;
mod node;
mod routes;
mod state;
mod store;
mod verify;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::signal;

use chain::types::Key;

use config::ApiConfig;
use node::{CachedNode, HttpNode};
use routes::{bid, commit, health};
use state::{AppState, SharedState};
use store::{clean_store, MemBidStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "builder_api=info,chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now we use default configs. These can be externalised later.
    let cfg = ApiConfig::default();

    // ---------------------------
    // Builder key
    // ---------------------------

    let key = Key::load_or_generate(&cfg.key_file)
        .map_err(|e| format!("failed to load builder key: {e}"))?;
    tracing::info!(address = %key.address, "builder key loaded");

    // ---------------------------
    // Trusted node + cache
    // ---------------------------

    let direct = HttpNode::connect(&cfg.node_uri, Duration::from_secs(3))
        .await
        .map_err(|e| format!("failed to connect to trusted node {}: {e}", cfg.node_uri))?;

    let cached = Arc::new(CachedNode::new(direct, vec![key.address.clone()]));

    {
        let cached = cached.clone();
        let interval = cfg.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = cached.refresh_proposers().await {
                    tracing::warn!(err = %e, "refresh proposers failed");
                }
            }
        });
    }

    {
        let cached = cached.clone();
        let interval = cfg.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = cached.refresh_accounts().await {
                    tracing::warn!(err = %e, "refresh accounts failed");
                }
            }
        });
    }

    tracing::info!("waiting for node cache to be ready...");
    cached.wait_until_ready().await;
    tracing::info!("node cache is ready");

    // ---------------------------
    // Bid store + background loops
    // ---------------------------

    let store = Arc::new(MemBidStore::new());

    {
        // Regularly clean old bids out of the store.
        let store = store.clone();
        let interval = cfg.clean_interval;
        let cutoff = cfg.bid_cutoff;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                clean_store(store.as_ref(), cutoff);
            }
        });
    }

    {
        // Regularly check winning bids for inclusion, reporting proposers
        // that dropped a committed segment.
        let cfg = cfg.clone();
        let store = store.clone();
        let node = cached.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cfg.verify_interval);
            loop {
                ticker.tick().await;
                if let Err(e) =
                    verify::verify_bids(&cfg, store.as_ref(), node.as_ref(), &key).await
                {
                    tracing::warn!(err = %e, "verify bids failed");
                }
            }
        });
    }

    // ---------------------------
    // Shared state + HTTP router
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        key,
        node: cached,
        store,
        cfg: cfg.clone(),
    });

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/v0/bid", post(bid::bid))
        .route("/v0/commit", post(commit::commit))
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(app_state);

    tracing::info!("builder API listening on http://{}", cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Logs every request with its method, path, status, and duration.
async fn log_requests(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let begin = std::time::Instant::now();

    let res = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = res.status().as_u16(),
        took = ?begin.elapsed(),
        "request"
    );
    res
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

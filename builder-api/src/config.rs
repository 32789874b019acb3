//! Builder API configuration.
//!
//! Aggregates the HTTP listen address, the trusted node endpoint, the
//! builder key location, the bidding policy constants, and the cadence of
//! the background loops.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the builder API service.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Base URL of the trusted node's RPC endpoint.
    pub node_uri: String,
    /// Path to the builder's JSON key file. Generated on first start if
    /// missing.
    pub key_file: String,
    /// Flat payment promise amount offered in every bid, in the request's
    /// payment denom.
    pub default_payment_amount: u128,
    /// Gas limit on builder-assembled commitment transactions.
    pub commit_gas_limit: u64,
    /// Flat fee on builder-assembled commitment transactions, in the base
    /// denom.
    pub commit_fee_amount: u128,
    /// How often the node cache refreshes proposers and accounts.
    pub refresh_interval: Duration,
    /// How often stale bids are cleaned from the store.
    pub clean_interval: Duration,
    /// How often winning bids are checked for inclusion.
    pub verify_interval: Duration,
    /// Age beyond which pending or unverified bids are discarded.
    pub bid_cutoff: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            // All interfaces, so container port mappings reach the API.
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9099)),
            node_uri: "http://127.0.0.1:26657".to_string(),
            key_file: "data/builder-key.json".to_string(),
            default_payment_amount: 250,
            commit_gas_limit: 100_000,
            commit_fee_amount: 5,
            refresh_interval: Duration::from_secs(1),
            clean_interval: Duration::from_secs(10),
            verify_interval: Duration::from_secs(3),
            bid_cutoff: Duration::from_secs(60),
        }
    }
}

//! Top-level configuration for a chain node running the auction module.
//!
//! This module aggregates configuration for:
//!
//! - the auction engine (deadline, response cap),
//! - storage (RocksDB path and creation flags),
//! - the proposer signing key (key file path),
//! - the metrics exporter (optional listen address).
//!
//! The goal is to have a single `ChainConfig` struct that higher-level
//! binaries can construct from defaults, config files, or environment
//! variables as needed.

use std::net::SocketAddr;

use crate::auction::EngineConfig;
use crate::store::RocksDbConfig;

/// Configuration for the proposer signing key.
#[derive(Clone, Debug)]
pub struct ProposerKeyConfig {
    /// Path to the JSON key file. Generated on first start if missing.
    pub key_file: String,
}

impl Default for ProposerKeyConfig {
    fn default() -> Self {
        Self {
            key_file: "data/proposer-key.json".to_string(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Bind address of the `/metrics` exporter; `None` disables it.
    pub listen_addr: Option<SocketAddr>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Loopback on the conventional Prometheus exporter port.
        Self {
            listen_addr: Some(SocketAddr::from(([127, 0, 0, 1], 9464))),
        }
    }
}

/// Top-level configuration for a chain node.
#[derive(Clone, Debug, Default)]
pub struct ChainConfig {
    pub engine: EngineConfig,
    pub storage: RocksDbConfig,
    pub proposer_key: ProposerKeyConfig,
    pub metrics: MetricsConfig,
}

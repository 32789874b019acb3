//! Metrics and instrumentation for the auction.
//!
//! The engine records how long auctions take, how many bids survive
//! validation, how often it falls back to the default response, and what
//! the winning payment was. [`prometheus::MetricsRegistry`] bundles those
//! handles with the underlying registry, and [`prometheus::serve_metrics`]
//! exposes them over HTTP for scraping.
//!
//! Typical wiring in a node:
//!
//! ```ignore
//! use std::sync::Arc;
//! use chain::metrics::{serve_metrics, MetricsRegistry};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! if let Some(addr) = cfg.metrics.listen_addr {
//!     tokio::spawn(serve_metrics(registry.clone(), addr));
//! }
//!
//! // Elsewhere in the engine:
//! registry.auction.bids_received.inc();
//! ```

pub mod prometheus;

// `self::` keeps the module path from clashing with the prometheus crate.
pub use self::prometheus::{serve_metrics, AuctionMetrics, MetricsRegistry};

//! Shared application state.

use std::sync::Arc;

use chain::types::Key;

use crate::config::ApiConfig;
use crate::node::Node;
use crate::store::BidStore;

/// State held by the API handlers and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Builder signing key; responses and commitments are signed with it.
    pub key: Key,
    /// Trusted-node view (usually a [`crate::node::CachedNode`]).
    pub node: Arc<dyn Node>,
    /// Bid persistence.
    pub store: Arc<dyn BidStore>,
    /// Service configuration.
    pub cfg: ApiConfig,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;

//! HTTP routes of the builder API.
//!
//! - `POST /v0/bid`: solicit (or re-fetch) the sealed bid for an auction,
//! - `POST /v0/commit`: commit to a winning bid,
//! - `GET /health`: liveness.
//!
//! Both protocol endpoints validate the incoming request against the
//! trusted-node view before touching the bid store: the proposer must be
//! registered at the previous height, its validator bonded and not
//! jailed, and the request signature must verify against the proposer's
//! registered key. Failure codes: 400 for undecodable requests, 502 for
//! requests that fail node validation, 500 for internal errors.

pub mod bid;
pub mod commit;
pub mod health;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use chain::types::PubKey;

use crate::node::NodeError;
use crate::state::SharedState;

/// JSON error body returned by all failure paths.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorBody>);

pub(crate) fn api_error(code: StatusCode, err: impl std::fmt::Display) -> ApiError {
    (
        code,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

/// Validates a bid or commit request against the trusted-node view.
///
/// `verify` receives the proposer's registered public key and must check
/// the request signature with it.
pub(crate) async fn validate_request(
    state: &SharedState,
    height: i64,
    proposer_addr: &str,
    verify: impl FnOnce(&PubKey) -> bool,
) -> Result<(), ApiError> {
    let bad_gateway =
        |err: &dyn std::fmt::Display| api_error(StatusCode::BAD_GATEWAY, format!("validate request: {err}"));

    let view = state
        .node
        .proposer(height - 1, proposer_addr)
        .await
        .map_err(|err: NodeError| bad_gateway(&err))?;

    let Some(validator) = view.validator else {
        return Err(bad_gateway(&format!(
            "proposer {proposer_addr} not in staking validator set at height {height}"
        )));
    };

    if !validator.bonded {
        return Err(bad_gateway(&format!(
            "proposer {proposer_addr} not bonded at height {height}"
        )));
    }

    if validator.jailed {
        return Err(bad_gateway(&format!(
            "proposer {proposer_addr} jailed at height {height}"
        )));
    }

    if !verify(&view.proposer.pubkey) {
        return Err(bad_gateway(&"bad signature"));
    }

    Ok(())
}

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Version string of the bid/commit API this service speaks.
pub const BUILDER_API_VERSION: &str = "v0";

/// Health-check response: liveness plus the spoken API version, so
/// proposers can sanity-check a builder registration out of band.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub builder_api_version: &'static str,
}

/// `GET /health`
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            builder_api_version: BUILDER_API_VERSION,
        }),
    )
}

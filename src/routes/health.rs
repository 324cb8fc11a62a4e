use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::ResultCache;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// API version
    pub version: String,
    /// Number of race keys with a recorded fetch state
    pub cached_races: usize,
    /// Currently active season, if one has been loaded
    pub season: Option<u16>,
}

/// Health check endpoint.
///
/// Purely local — it does not probe the upstream APIs, so a flapping
/// upstream cannot make the service look down to a load balancer.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(cache): State<ResultCache>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_races: cache.len().await,
        season: cache.season().await,
    })
}

//! Countdown status HTTP endpoint.
//!
//! GET /api/v1/countdown — returns the current state of the background
//! countdown ticker as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::countdown::{CountdownState, SharedCountdownState};

/// Get the current countdown status.
///
/// Returns the tracked race, the next main event (if any remains) and the
/// seconds until it starts, as of the last one-second tick.
#[utoipa::path(
    get,
    path = "/api/v1/countdown",
    tag = "Countdown",
    responses(
        (status = 200, description = "Current countdown status", body = CountdownState),
    )
)]
pub async fn get_countdown(State(state): State<SharedCountdownState>) -> Json<CountdownState> {
    let s = state.read().await;
    Json(s.clone())
}

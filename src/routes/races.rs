//! Season schedule HTTP endpoints.
//!
//! - GET /api/v1/seasons/:season/races
//! - GET /api/v1/seasons/:season/next

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::{AppError, ErrorResponse};
use crate::models::Race;
use crate::services::countdown::{self, SharedCountdownState};
use crate::services::jolpica::JolpicaClient;

/// Shared state for schedule endpoints.
#[derive(Clone)]
pub(crate) struct RacesState {
    pub(crate) jolpica: JolpicaClient,
    pub(crate) countdown: SharedCountdownState,
}

/// List the full race schedule for a season.
#[utoipa::path(
    get,
    path = "/api/v1/seasons/{season}/races",
    tag = "Schedule",
    params(
        ("season" = u16, Path, description = "Championship season, e.g. 2025"),
    ),
    responses(
        (status = 200, description = "Ordered race list for the season", body = Vec<Race>),
        (status = 502, description = "Schedule source unavailable", body = ErrorResponse),
    )
)]
pub async fn list_season_races(
    State(state): State<RacesState>,
    Path(season): Path<u16>,
) -> Result<Json<Vec<Race>>, AppError> {
    let races = state.jolpica.season_schedule(season).await?;
    Ok(Json(races))
}

/// Get the next upcoming race of a season.
///
/// Also points the countdown ticker at that race, so the countdown endpoint
/// tracks whatever the client last asked about.
#[utoipa::path(
    get,
    path = "/api/v1/seasons/{season}/next",
    tag = "Schedule",
    params(
        ("season" = u16, Path, description = "Championship season, e.g. 2025"),
    ),
    responses(
        (status = 200, description = "Next upcoming race", body = Race),
        (status = 404, description = "No upcoming race in this season", body = ErrorResponse),
        (status = 502, description = "Schedule source unavailable", body = ErrorResponse),
    )
)]
pub async fn next_race(
    State(state): State<RacesState>,
    Path(season): Path<u16>,
) -> Result<Json<Race>, AppError> {
    let race = state
        .jolpica
        .next_race(season)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No upcoming race in season {}", season)))?;

    countdown::set_tracked_race(&state.countdown, race.clone()).await;
    Ok(Json(race))
}

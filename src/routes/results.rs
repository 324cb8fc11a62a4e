//! Result aggregation HTTP endpoints.
//!
//! - POST /api/v1/seasons/:season/results/load — switch the cache to the
//!   season and dispatch fetches for every started race weekend
//! - GET  /api/v1/results/:season/:round — non-blocking cache read
//! - POST /api/v1/results/:season/:round/retry — explicit retry of a
//!   permanently failed key

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{FetchState, RaceKey, SessionResults};
use crate::services::jolpica::JolpicaClient;
use crate::services::results::ResultsService;

/// Shared application state for result endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) jolpica: JolpicaClient,
    pub(crate) results: ResultsService,
}

/// Summary of a season load dispatch.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoadSummary {
    pub season: u16,
    /// Races in the season schedule
    pub total_races: usize,
    /// Races whose race session has started (eligible for results)
    pub started: usize,
    /// Fetches actually dispatched (excludes keys already loading/cached)
    pub dispatched: usize,
}

/// Cached results for one race weekend.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceResultsResponse {
    pub season: u16,
    pub round: u8,
    pub state: FetchState,
    pub results: SessionResults,
}

/// Outcome of an explicit retry request.
#[derive(Debug, Serialize, ToSchema)]
pub struct RetryResponse {
    /// Whether a new fetch was dispatched. False when the key was not in
    /// the failed state (nothing to retry).
    pub dispatched: bool,
}

/// Load results for every started race of a season.
///
/// Switching seasons clears the cache wholesale; re-posting the same season
/// is cheap and never duplicates in-flight fetches.
#[utoipa::path(
    post,
    path = "/api/v1/seasons/{season}/results/load",
    tag = "Results",
    params(
        ("season" = u16, Path, description = "Championship season, e.g. 2025"),
    ),
    responses(
        (status = 200, description = "Dispatch summary", body = LoadSummary),
        (status = 502, description = "Schedule source unavailable", body = ErrorResponse),
    )
)]
pub async fn load_season_results(
    State(state): State<AppState>,
    Path(season): Path<u16>,
) -> Result<Json<LoadSummary>, AppError> {
    let races = state.jolpica.season_schedule(season).await?;
    state.results.cache().set_season(season).await;

    let now = Utc::now();
    let started: Vec<(RaceKey, bool)> = races
        .iter()
        .filter(|r| r.has_started(now))
        .map(|r| (r.key(), r.has_sprint()))
        .collect();

    let dispatched = state.results.ensure_loaded(&started).await;

    Ok(Json(LoadSummary {
        season,
        total_races: races.len(),
        started: started.len(),
        dispatched,
    }))
}

/// Read the cached results for one race. Non-blocking: returns whatever
/// state the key is in right now, never waits for an in-flight fetch.
#[utoipa::path(
    get,
    path = "/api/v1/results/{season}/{round}",
    tag = "Results",
    params(
        ("season" = u16, Path, description = "Championship season"),
        ("round" = u8, Path, description = "Round number within the season"),
    ),
    responses(
        (status = 200, description = "Cached results and fetch state", body = RaceResultsResponse),
    )
)]
pub async fn get_race_results(
    State(state): State<AppState>,
    Path((season, round)): Path<(u16, u8)>,
) -> Json<RaceResultsResponse> {
    let key = RaceKey::new(season, round);
    let (results, fetch_state) = state.results.cache().get(key).await;
    Json(RaceResultsResponse {
        season,
        round,
        state: fetch_state,
        results,
    })
}

/// Explicitly retry a permanently failed race.
#[utoipa::path(
    post,
    path = "/api/v1/results/{season}/{round}/retry",
    tag = "Results",
    params(
        ("season" = u16, Path, description = "Championship season"),
        ("round" = u8, Path, description = "Round number within the season"),
    ),
    responses(
        (status = 200, description = "Retry outcome", body = RetryResponse),
        (status = 404, description = "Round not present in the season schedule", body = ErrorResponse),
        (status = 502, description = "Schedule source unavailable", body = ErrorResponse),
    )
)]
pub async fn retry_race_results(
    State(state): State<AppState>,
    Path((season, round)): Path<(u16, u8)>,
) -> Result<Json<RetryResponse>, AppError> {
    // The schedule record decides whether the weekend has a sprint; never
    // guess the format from the failed entry.
    let races = state.jolpica.season_schedule(season).await?;
    let race = races
        .iter()
        .find(|r| r.round == round)
        .ok_or_else(|| AppError::NotFound(format!("Round {} not found in season {}", round, season)))?;

    let dispatched = state.results.retry_failed(race.key(), race.has_sprint()).await;
    Ok(Json(RetryResponse { dispatched }))
}

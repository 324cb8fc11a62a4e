//! Per-session weather HTTP endpoint.
//!
//! GET /api/v1/weather/:season/:round — the weekend's sessions with their
//! hour-aligned forecast samples.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::models::WeatherSample;
use crate::services::jolpica::JolpicaClient;
use crate::services::openmeteo::OpenMeteoClient;
use crate::services::weather::align_weather;

/// Shared state for weather endpoints.
#[derive(Clone)]
pub(crate) struct WeatherState {
    pub(crate) jolpica: JolpicaClient,
    pub(crate) open_meteo: OpenMeteoClient,
}

/// One session with its aligned forecast sample (absent when the forecast
/// window has no matching hour or the circuit is unknown).
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionWeatherEntry {
    /// Session display label, e.g. "Sprint Qualifying"
    pub session: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSample>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RaceWeatherResponse {
    pub season: u16,
    pub round: u8,
    pub circuit_id: String,
    pub sessions: Vec<SessionWeatherEntry>,
}

/// Weather for every session of one race weekend.
///
/// Weather is advisory: sessions simply come back without a `weather` field
/// when no forecast is available. Only a missing round is an error.
#[utoipa::path(
    get,
    path = "/api/v1/weather/{season}/{round}",
    tag = "Weather",
    params(
        ("season" = u16, Path, description = "Championship season"),
        ("round" = u8, Path, description = "Round number within the season"),
    ),
    responses(
        (status = 200, description = "Per-session weather for the weekend", body = RaceWeatherResponse),
        (status = 404, description = "Round not present in the season schedule", body = ErrorResponse),
        (status = 502, description = "Schedule source unavailable", body = ErrorResponse),
    )
)]
pub async fn get_race_weather(
    State(state): State<WeatherState>,
    Path((season, round)): Path<(u16, u8)>,
) -> Result<Json<RaceWeatherResponse>, AppError> {
    let races = state.jolpica.season_schedule(season).await?;
    let race = races
        .into_iter()
        .find(|r| r.round == round)
        .ok_or_else(|| AppError::NotFound(format!("Round {} not found in season {}", round, season)))?;

    let sessions = race.sessions();
    let times: Vec<_> = sessions.iter().map(|(_, t)| t.clone()).collect();
    let aligned = align_weather(&state.open_meteo, &race.circuit.circuit_id, &times).await;

    // Consumption-boundary join: look each session up by its own raw
    // date+"T"+time string, mirroring how the map was keyed.
    let entries = sessions
        .into_iter()
        .map(|(kind, t)| {
            let weather = t.key().and_then(|key| aligned.get(&key).copied());
            SessionWeatherEntry {
                session: kind.label().to_string(),
                date: t.date,
                time: t.time,
                weather,
            }
        })
        .collect();

    Ok(Json(RaceWeatherResponse {
        season,
        round,
        circuit_id: race.circuit.circuit_id,
        sessions: entries,
    }))
}

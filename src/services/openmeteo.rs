//! Open-Meteo forecast client.
//!
//! Fetches hourly forecast series for a coordinate and date window.
//! See: https://open-meteo.com/en/docs
//!
//! The response carries parallel arrays, index-aligned with the `time`
//! array; `iter_samples` re-zips them so the rest of the crate never deals
//! with positional indexing.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::WeatherSample;

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

/// Hourly forecast series; the three value arrays are index-aligned with
/// `time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<f64>,
    #[serde(default)]
    pub precipitation_probability: Vec<i64>,
    #[serde(default)]
    pub weathercode: Vec<i64>,
}

impl HourlySeries {
    /// Zip the aligned arrays into `(slot time, sample)` pairs. Iteration
    /// stops at the shortest array, so a truncated upstream response can
    /// never mis-align values against times.
    pub fn iter_samples(&self) -> impl Iterator<Item = (&str, WeatherSample)> {
        self.time
            .iter()
            .zip(&self.temperature_2m)
            .zip(&self.precipitation_probability)
            .zip(&self.weathercode)
            .map(|(((time, &temp), &precip), &code)| {
                (
                    time.as_str(),
                    WeatherSample {
                        temperature_c: temp.round() as i32,
                        precipitation_probability: precip.clamp(0, 100) as u8,
                        weather_code: code.clamp(0, u16::MAX as i64) as u16,
                    },
                )
            })
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlySeries>,
}

impl OpenMeteoClient {
    /// Build a client against `base_url` with a per-request timeout.
    /// The base URL is injectable so tests can point at a local mock server.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the hourly series for one coordinate over [start_date, end_date]
    /// (inclusive, day granularity, GMT timestamps).
    pub async fn hourly_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HourlySeries, AppError> {
        let url = format!(
            "{}/forecast?latitude={:.4}&longitude={:.4}&hourly=temperature_2m,precipitation_probability,weathercode&start_date={}&end_date={}&timezone=GMT",
            self.base_url, latitude, longitude, start_date, end_date
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("open-meteo request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "open-meteo returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ForecastResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("open-meteo JSON parse error: {}", e))
        })?;

        Ok(parsed.hourly.unwrap_or_default())
    }
}

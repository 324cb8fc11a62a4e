//! Weather alignment for race-weekend sessions.
//!
//! Given a circuit and the weekend's session timestamps, fetches one hourly
//! forecast window spanning every session and maps each timestamp to the
//! sample of its own UTC hour. Weather is an enrichment: an unknown circuit,
//! a failed fetch, or an unmatched hour yields absent entries, never an
//! error — the rest of the service must not depend on it.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::helpers::{parse_hour_slot, same_utc_hour};
use crate::models::{SessionTime, WeatherSample};
use crate::services::openmeteo::{HourlySeries, OpenMeteoClient};

/// Fixed coordinates per circuit identifier.
///
/// The schedule feed carries coordinates as strings; the aligner uses this
/// table instead so the forecast request is stable regardless of feed
/// formatting.
pub fn circuit_coordinates(circuit_id: &str) -> Option<(f64, f64)> {
    let (lat, lon) = match circuit_id {
        "albert_park" => (-37.8497, 144.968),
        "americas" => (30.1328, -97.6411),
        "bahrain" => (26.0325, 50.5106),
        "baku" => (40.3725, 49.8533),
        "catalunya" => (41.57, 2.26111),
        "hungaroring" => (47.5789, 19.2486),
        "imola" => (44.3439, 11.7167),
        "interlagos" => (-23.7036, -46.6997),
        "jeddah" => (21.6319, 39.1044),
        "losail" => (25.49, 51.4542),
        "marina_bay" => (1.2914, 103.864),
        "miami" => (25.9581, -80.2389),
        "monaco" => (43.7347, 7.42056),
        "monza" => (45.6156, 9.28111),
        "red_bull_ring" => (47.2197, 14.7647),
        "rodriguez" => (19.4042, -99.0907),
        "shanghai" => (31.3389, 121.22),
        "silverstone" => (52.0786, -1.01694),
        "spa" => (50.4372, 5.97139),
        "suzuka" => (34.8431, 136.541),
        "vegas" => (36.1147, -115.173),
        "villeneuve" => (45.5, -73.5228),
        "yas_marina" => (24.4672, 54.6031),
        "zandvoort" => (52.3888, 4.54092),
        _ => return None,
    };
    Some((lat, lon))
}

/// Align the weekend's session timestamps to hourly forecast samples.
///
/// The returned map is keyed by the exact `date + "T" + time` string of each
/// input timestamp — the same concatenation the schedule layer looks up, so
/// the join is by string equality, not parsed-time comparison.
pub async fn align_weather(
    client: &OpenMeteoClient,
    circuit_id: &str,
    sessions: &[SessionTime],
) -> HashMap<String, WeatherSample> {
    let Some((latitude, longitude)) = circuit_coordinates(circuit_id) else {
        tracing::debug!("No coordinates for circuit '{}', skipping weather", circuit_id);
        return HashMap::new();
    };

    // Sessions without a published time have no join key and no forecast.
    let targets: Vec<(String, DateTime<Utc>)> = sessions
        .iter()
        .filter_map(|s| Some((s.key()?, s.datetime()?)))
        .collect();

    if targets.is_empty() {
        return HashMap::new();
    }

    // One request covers the whole weekend: [min, max] at day granularity.
    let mut dates = targets.iter().map(|(_, t)| t.date_naive());
    let first = match dates.next() {
        Some(d) => d,
        None => return HashMap::new(),
    };
    let (start_date, end_date) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));

    let series = match client
        .hourly_forecast(latitude, longitude, start_date, end_date)
        .await
    {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!("Forecast unavailable for circuit '{}': {}", circuit_id, e);
            return HashMap::new();
        }
    };

    join_sessions_to_series(&targets, &series)
}

/// Hour-exact join of session instants against an hourly series.
fn join_sessions_to_series(
    targets: &[(String, DateTime<Utc>)],
    series: &HourlySeries,
) -> HashMap<String, WeatherSample> {
    let slots: Vec<(NaiveDateTime, WeatherSample)> = series
        .iter_samples()
        .filter_map(|(time, sample)| parse_hour_slot(time).map(|slot| (slot, sample)))
        .collect();

    let mut aligned = HashMap::new();
    for (key, instant) in targets {
        if let Some((_, sample)) = slots.iter().find(|(slot, _)| same_utc_hour(*instant, *slot)) {
            aligned.insert(key.clone(), *sample);
        }
        // No matching hour: the timestamp is simply absent from the output.
    }
    aligned
}

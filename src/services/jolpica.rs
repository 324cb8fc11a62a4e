//! Jolpica (Ergast-compatible) API client.
//!
//! Fetches season schedules and per-session results.
//! See: https://api.jolpi.ca/ergast/f1/
//!
//! The upstream encodes numerics as JSON strings and wraps everything in an
//! `MRData` envelope; both stay confined to this module. Absence of an
//! expected node ("Races", "Results", ...) is an empty list, not an error —
//! whether an empty race list is acceptable is the orchestrator's call, not
//! the client's.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    Circuit, FastestLap, Location, Race, RaceKey, SessionResult, SessionTime,
};

/// Client for the Jolpica schedule/results API.
#[derive(Debug, Clone)]
pub struct JolpicaClient {
    client: reqwest::Client,
    base_url: String,
}

impl JolpicaClient {
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

    /// `GET /{season}.json` — the ordered race list for a season.
    pub async fn season_schedule(&self, season: u16) -> Result<Vec<Race>, AppError> {
        let url = format!("{}/{}.json", self.base_url, season);
        let envelope: Envelope = self.get_json(&url).await?;
        envelope.races().into_iter().map(Race::try_from).collect()
    }

    /// `GET /{season}/next.json` — the next upcoming race, if any.
    pub async fn next_race(&self, season: u16) -> Result<Option<Race>, AppError> {
        let url = format!("{}/{}/next.json", self.base_url, season);
        let envelope: Envelope = self.get_json(&url).await?;
        envelope
            .races()
            .into_iter()
            .next()
            .map(Race::try_from)
            .transpose()
    }

    /// `GET /{season}/{round}/results.json` — race finish order.
    pub async fn race_results(&self, key: RaceKey) -> Result<Vec<SessionResult>, AppError> {
        let url = format!("{}/{}/{}/results.json", self.base_url, key.season, key.round);
        let envelope: Envelope = self.get_json(&url).await?;
        Ok(envelope
            .races()
            .into_iter()
            .flat_map(|r| r.results)
            .map(SessionResult::from)
            .collect())
    }

    /// `GET /{season}/{round}/qualifying.json` — qualifying classification.
    pub async fn qualifying_results(&self, key: RaceKey) -> Result<Vec<SessionResult>, AppError> {
        let url = format!(
            "{}/{}/{}/qualifying.json",
            self.base_url, key.season, key.round
        );
        let envelope: Envelope = self.get_json(&url).await?;
        Ok(envelope
            .races()
            .into_iter()
            .flat_map(|r| r.qualifying_results)
            .map(SessionResult::from)
            .collect())
    }

    /// `GET /{season}/{round}/sprint.json` — sprint finish order.
    pub async fn sprint_results(&self, key: RaceKey) -> Result<Vec<SessionResult>, AppError> {
        let url = format!("{}/{}/{}/sprint.json", self.base_url, key.season, key.round);
        let envelope: Envelope = self.get_json(&url).await?;
        Ok(envelope
            .races()
            .into_iter()
            .flat_map(|r| r.sprint_results)
            .map(SessionResult::from)
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("jolpica request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "jolpica returned HTTP {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("jolpica JSON parse error: {}", e))
        })
    }
}

// --- Jolpica JSON response types ---

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

impl Envelope {
    fn races(self) -> Vec<WireRace> {
        self.mr_data
            .race_table
            .map(|t| t.races)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable")]
    race_table: Option<RaceTable>,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<WireRace>,
}

#[derive(Debug, Deserialize)]
struct WireRace {
    season: String,
    round: String,
    #[serde(rename = "raceName")]
    race_name: String,
    #[serde(rename = "Circuit")]
    circuit: WireCircuit,
    date: String,
    time: Option<String>,
    #[serde(rename = "FirstPractice")]
    first_practice: Option<WireSession>,
    #[serde(rename = "SecondPractice")]
    second_practice: Option<WireSession>,
    #[serde(rename = "ThirdPractice")]
    third_practice: Option<WireSession>,
    // Jolpica has used both names for the sprint-format Saturday qualifier
    #[serde(rename = "SprintQualifying", alias = "SprintShootout")]
    sprint_qualifying: Option<WireSession>,
    #[serde(rename = "Sprint")]
    sprint: Option<WireSession>,
    #[serde(rename = "Qualifying")]
    qualifying: Option<WireSession>,
    #[serde(rename = "Results", default)]
    results: Vec<WireResult>,
    #[serde(rename = "QualifyingResults", default)]
    qualifying_results: Vec<WireQualifyingResult>,
    #[serde(rename = "SprintResults", default)]
    sprint_results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireCircuit {
    #[serde(rename = "circuitId")]
    circuit_id: String,
    #[serde(rename = "circuitName")]
    circuit_name: String,
    #[serde(rename = "Location")]
    location: WireLocation,
}

#[derive(Debug, Deserialize, Default)]
struct WireLocation {
    #[serde(default)]
    lat: String,
    #[serde(default)]
    long: String,
    #[serde(default)]
    locality: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    date: String,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    position: Option<String>,
    points: Option<String>,
    #[serde(rename = "Driver")]
    driver: WireDriver,
    #[serde(rename = "Constructor")]
    constructor: Option<WireConstructor>,
    #[serde(rename = "Time")]
    time: Option<WireTime>,
    status: Option<String>,
    #[serde(rename = "FastestLap")]
    fastest_lap: Option<WireFastestLap>,
}

#[derive(Debug, Deserialize)]
struct WireQualifyingResult {
    position: Option<String>,
    #[serde(rename = "Driver")]
    driver: WireDriver,
    #[serde(rename = "Constructor")]
    constructor: Option<WireConstructor>,
    #[serde(rename = "Q1")]
    q1: Option<String>,
    #[serde(rename = "Q2")]
    q2: Option<String>,
    #[serde(rename = "Q3")]
    q3: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDriver {
    #[serde(rename = "driverId")]
    driver_id: String,
    #[serde(rename = "givenName", default)]
    given_name: String,
    #[serde(rename = "familyName", default)]
    family_name: String,
}

#[derive(Debug, Deserialize)]
struct WireConstructor {
    #[serde(rename = "constructorId")]
    constructor_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireTime {
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFastestLap {
    rank: Option<String>,
    lap: Option<String>,
    #[serde(rename = "Time")]
    time: Option<WireTime>,
}

// --- Wire → domain conversions ---

/// Parse a string-encoded integer, mapping non-numeric markers to None
/// (upstream uses text positions for classified-but-unordered entries).
fn parse_u32(s: Option<String>) -> Option<u32> {
    s.and_then(|v| v.parse().ok())
}

fn parse_f32(s: Option<String>) -> Option<f32> {
    s.and_then(|v| v.parse().ok())
}

impl TryFrom<WireRace> for Race {
    type Error = AppError;

    fn try_from(wire: WireRace) -> Result<Self, Self::Error> {
        let season = wire.season.parse().map_err(|_| {
            AppError::ExternalServiceError(format!("jolpica returned non-numeric season: {}", wire.season))
        })?;
        let round = wire.round.parse().map_err(|_| {
            AppError::ExternalServiceError(format!("jolpica returned non-numeric round: {}", wire.round))
        })?;
        Ok(Race {
            season,
            round,
            race_name: wire.race_name,
            circuit: Circuit::from(wire.circuit),
            date: wire.date,
            time: wire.time,
            first_practice: wire.first_practice.map(SessionTime::from),
            second_practice: wire.second_practice.map(SessionTime::from),
            third_practice: wire.third_practice.map(SessionTime::from),
            sprint_qualifying: wire.sprint_qualifying.map(SessionTime::from),
            sprint: wire.sprint.map(SessionTime::from),
            qualifying: wire.qualifying.map(SessionTime::from),
        })
    }
}

impl From<WireCircuit> for Circuit {
    fn from(wire: WireCircuit) -> Self {
        Circuit {
            circuit_id: wire.circuit_id,
            circuit_name: wire.circuit_name,
            location: Location {
                lat: wire.location.lat,
                long: wire.location.long,
                locality: wire.location.locality,
                country: wire.location.country,
            },
        }
    }
}

impl From<WireSession> for SessionTime {
    fn from(wire: WireSession) -> Self {
        SessionTime {
            date: wire.date,
            time: wire.time,
        }
    }
}

impl From<WireResult> for SessionResult {
    fn from(wire: WireResult) -> Self {
        let (constructor_id, constructor_name) = wire
            .constructor
            .map(|c| (c.constructor_id, c.name))
            .unwrap_or_default();
        SessionResult {
            position: parse_u32(wire.position),
            driver_name: format!("{} {}", wire.driver.given_name, wire.driver.family_name)
                .trim()
                .to_string(),
            driver_id: wire.driver.driver_id,
            constructor_id,
            constructor_name,
            points: parse_f32(wire.points),
            time: wire.time.and_then(|t| t.time),
            status: wire.status,
            fastest_lap: wire.fastest_lap.map(|fl| FastestLap {
                rank: parse_u32(fl.rank),
                lap: parse_u32(fl.lap),
                time: fl.time.and_then(|t| t.time),
            }),
        }
    }
}

impl From<WireQualifyingResult> for SessionResult {
    fn from(wire: WireQualifyingResult) -> Self {
        let (constructor_id, constructor_name) = wire
            .constructor
            .map(|c| (c.constructor_id, c.name))
            .unwrap_or_default();
        // The best knockout segment a driver reached is their classification
        // time: Q3 if set, else Q2, else Q1. No points, no status.
        let best = wire.q3.or(wire.q2).or(wire.q1);
        SessionResult {
            position: parse_u32(wire.position),
            driver_name: format!("{} {}", wire.driver.given_name, wire.driver.family_name)
                .trim()
                .to_string(),
            driver_id: wire.driver.driver_id,
            constructor_id,
            constructor_name,
            points: None,
            time: best,
            status: None,
            fastest_lap: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_with_races(races: serde_json::Value) -> Envelope {
        serde_json::from_value(serde_json::json!({
            "MRData": { "RaceTable": { "Races": races } }
        }))
        .unwrap()
    }

    #[test]
    fn test_race_result_conversion() {
        let envelope = envelope_with_races(serde_json::json!([{
            "season": "2025",
            "round": "6",
            "raceName": "Miami Grand Prix",
            "Circuit": {
                "circuitId": "miami",
                "circuitName": "Miami International Autodrome",
                "Location": { "lat": "25.9581", "long": "-80.2389", "locality": "Miami", "country": "USA" }
            },
            "date": "2025-05-04",
            "time": "20:00:00Z",
            "Results": [{
                "position": "1",
                "points": "25",
                "Driver": { "driverId": "piastri", "givenName": "Oscar", "familyName": "Piastri" },
                "Constructor": { "constructorId": "mclaren", "name": "McLaren" },
                "Time": { "time": "1:28:51.587" },
                "status": "Finished",
                "FastestLap": { "rank": "2", "lap": "40", "Time": { "time": "1:29.746" } }
            }, {
                "position": "18",
                "points": "0",
                "Driver": { "driverId": "lawson", "givenName": "Liam", "familyName": "Lawson" },
                "Constructor": { "constructorId": "rb", "name": "RB F1 Team" },
                "status": "Retired"
            }]
        }]));

        let results: Vec<SessionResult> = envelope
            .races()
            .into_iter()
            .flat_map(|r| r.results)
            .map(SessionResult::from)
            .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, Some(1));
        assert_eq!(results[0].driver_name, "Oscar Piastri");
        assert_eq!(results[0].constructor_id, "mclaren");
        assert_eq!(results[0].points, Some(25.0));
        assert_eq!(results[0].time.as_deref(), Some("1:28:51.587"));
        assert_eq!(results[0].fastest_lap.as_ref().unwrap().rank, Some(2));

        assert_eq!(results[1].time, None);
        assert_eq!(results[1].status.as_deref(), Some("Retired"));
    }

    #[test]
    fn test_qualifying_folds_best_segment_time() {
        let envelope = envelope_with_races(serde_json::json!([{
            "season": "2025",
            "round": "6",
            "raceName": "Miami Grand Prix",
            "Circuit": {
                "circuitId": "miami",
                "circuitName": "Miami International Autodrome",
                "Location": { "lat": "25.9581", "long": "-80.2389", "locality": "Miami", "country": "USA" }
            },
            "date": "2025-05-04",
            "QualifyingResults": [{
                "position": "1",
                "Driver": { "driverId": "verstappen", "givenName": "Max", "familyName": "Verstappen" },
                "Constructor": { "constructorId": "red_bull", "name": "Red Bull" },
                "Q1": "1:27.543", "Q2": "1:26.987", "Q3": "1:26.204"
            }, {
                "position": "12",
                "Driver": { "driverId": "alonso", "givenName": "Fernando", "familyName": "Alonso" },
                "Constructor": { "constructorId": "aston_martin", "name": "Aston Martin" },
                "Q1": "1:28.001", "Q2": "1:27.700"
            }]
        }]));

        let results: Vec<SessionResult> = envelope
            .races()
            .into_iter()
            .flat_map(|r| r.qualifying_results)
            .map(SessionResult::from)
            .collect();

        assert_eq!(results[0].time.as_deref(), Some("1:26.204"), "Q3 wins");
        assert_eq!(results[1].time.as_deref(), Some("1:27.700"), "Q2 when no Q3");
        assert_eq!(results[0].points, None);
        assert_eq!(results[0].status, None);
    }

    #[test]
    fn test_missing_results_node_is_empty_list() {
        let envelope = envelope_with_races(serde_json::json!([{
            "season": "2025",
            "round": "6",
            "raceName": "Miami Grand Prix",
            "Circuit": {
                "circuitId": "miami",
                "circuitName": "Miami International Autodrome",
                "Location": { "lat": "25.9581", "long": "-80.2389", "locality": "Miami", "country": "USA" }
            },
            "date": "2025-05-04"
        }]));

        let races = envelope.races();
        assert_eq!(races.len(), 1);
        assert!(races[0].results.is_empty());
        assert!(races[0].qualifying_results.is_empty());
        assert!(races[0].sprint_results.is_empty());
    }

    #[test]
    fn test_missing_race_table_is_empty_list() {
        let envelope: Envelope =
            serde_json::from_value(serde_json::json!({ "MRData": {} })).unwrap();
        assert!(envelope.races().is_empty());
    }

    #[test]
    fn test_schedule_conversion_with_sprint_shootout_alias() {
        let envelope = envelope_with_races(serde_json::json!([{
            "season": "2025",
            "round": "6",
            "raceName": "Miami Grand Prix",
            "Circuit": {
                "circuitId": "miami",
                "circuitName": "Miami International Autodrome",
                "Location": { "lat": "25.9581", "long": "-80.2389", "locality": "Miami", "country": "USA" }
            },
            "date": "2025-05-04",
            "time": "20:00:00Z",
            "FirstPractice": { "date": "2025-05-02", "time": "16:30:00Z" },
            "SprintShootout": { "date": "2025-05-02", "time": "20:30:00Z" },
            "Sprint": { "date": "2025-05-03", "time": "16:00:00Z" },
            "Qualifying": { "date": "2025-05-03", "time": "20:00:00Z" }
        }]));

        let race = Race::try_from(envelope.races().remove(0)).unwrap();
        assert_eq!(race.key(), RaceKey::new(2025, 6));
        assert!(race.has_sprint());
        assert!(race.sprint_qualifying.is_some(), "alias must deserialize");
        assert_eq!(race.circuit.circuit_id, "miami");
    }

    #[test]
    fn test_non_numeric_position_maps_to_none() {
        assert_eq!(parse_u32(Some("R".to_string())), None);
        assert_eq!(parse_u32(Some("4".to_string())), Some(4));
        assert_eq!(parse_u32(None), None);
    }

    #[test]
    fn test_non_numeric_round_is_an_error() {
        let envelope = envelope_with_races(serde_json::json!([{
            "season": "2025",
            "round": "sixth",
            "raceName": "Miami Grand Prix",
            "Circuit": {
                "circuitId": "miami",
                "circuitName": "Miami International Autodrome",
                "Location": { "lat": "25.9581", "long": "-80.2389", "locality": "Miami", "country": "USA" }
            },
            "date": "2025-05-04"
        }]));
        assert!(Race::try_from(envelope.races().remove(0)).is_err());
    }
}

//! Core domain types for the aggregation engine.
//!
//! Everything here is derived from Schedule Source data at read time and is
//! never mutated afterwards. Wire-format structs (string-encoded numerics,
//! upstream key casing) stay private to the client modules; these are the
//! shapes the rest of the crate works with.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::helpers::{parse_session_datetime, session_time_key};

/// Identifies one race weekend: season + round. Immutable once created and
/// the only key the result cache is addressed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RaceKey {
    pub season: u16,
    pub round: u8,
}

impl RaceKey {
    pub fn new(season: u16, round: u8) -> Self {
        Self { season, round }
    }
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} round {}", self.season, self.round)
    }
}

/// A discrete timed event within a race weekend.
///
/// Sprint-family kinds appear only on sprint-format weekends, as declared by
/// the schedule record — the engine never guesses the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionKind {
    /// Display label (also used as the countdown event name).
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
            SessionKind::SprintQualifying => "Sprint Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Race => "Race",
        }
    }

    /// Main events are everything except practice — the sessions the
    /// countdown considers.
    pub fn is_main_event(&self) -> bool {
        !matches!(
            self,
            SessionKind::Practice1 | SessionKind::Practice2 | SessionKind::Practice3
        )
    }
}

/// Per-key lifecycle of a result fetch.
///
/// Transitions are monotonic forward, except that `FailedPermanently` can be
/// reset by an explicit user retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    NotStarted,
    Loading,
    Succeeded,
    FailedPermanently,
}

/// One finisher's record for a session.
///
/// `position` is absent for classified-but-unordered entries. `points` is
/// only populated for Race and Sprint. `time` carries the completion time
/// where one exists (for qualifying, the best knockout-segment time);
/// otherwise `status` explains the outcome ("Retired", "Accident", ...).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResult {
    pub position: Option<u32>,
    pub driver_id: String,
    pub driver_name: String,
    pub constructor_id: String,
    pub constructor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest_lap: Option<FastestLap>,
}

/// Fastest-lap sub-record on a race or sprint result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FastestLap {
    pub rank: Option<u32>,
    pub lap: Option<u32>,
    pub time: Option<String>,
}

/// The unit stored in the result cache: the three finish-order lists for one
/// race weekend. Once committed for a concluded race the entry is final for
/// the process lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SessionResults {
    pub race: Vec<SessionResult>,
    pub qualifying: Vec<SessionResult>,
    pub sprint: Vec<SessionResult>,
}

impl SessionResults {
    pub fn is_empty(&self) -> bool {
        self.race.is_empty() && self.qualifying.is_empty() && self.sprint.is_empty()
    }
}

/// A scheduled session's (date, time) pair in the venue's schedule feed.
///
/// Treated as an opaque lookup key by the weather aligner — `key()` is the
/// exact string the weather map is addressed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionTime {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl SessionTime {
    /// The schedule↔weather join key: `date` + `"T"` + `time`.
    /// Sessions without a published time have no key (and no forecast).
    pub fn key(&self) -> Option<String> {
        self.time.as_deref().map(|t| session_time_key(&self.date, t))
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        parse_session_datetime(&self.date, self.time.as_deref())
    }
}

/// Circuit location from the schedule feed. Coordinates are carried verbatim
/// for display; the weather aligner resolves coordinates from its own static
/// table keyed by `circuit_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub lat: String,
    pub long: String,
    pub locality: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Circuit {
    pub circuit_id: String,
    pub circuit_name: String,
    pub location: Location,
}

/// One race record from the season schedule, with its declared sessions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Race {
    pub season: u16,
    pub round: u8,
    pub race_name: String,
    pub circuit: Circuit,
    /// Race-session date (`"2025-05-04"`).
    pub date: String,
    /// Race-session start time (`"13:00:00Z"`), absent in old seasons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_practice: Option<SessionTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_practice: Option<SessionTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_practice: Option<SessionTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_qualifying: Option<SessionTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint: Option<SessionTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifying: Option<SessionTime>,
}

impl Race {
    pub fn key(&self) -> RaceKey {
        RaceKey::new(self.season, self.round)
    }

    /// Sprint-format weekends are the ones whose schedule record declares a
    /// sprint-family session.
    pub fn has_sprint(&self) -> bool {
        self.sprint.is_some() || self.sprint_qualifying.is_some()
    }

    /// Every declared session of the weekend, race included, in weekend
    /// order. Only sessions the schedule record carries are returned.
    pub fn sessions(&self) -> Vec<(SessionKind, SessionTime)> {
        let mut sessions = Vec::new();
        let declared = [
            (SessionKind::Practice1, &self.first_practice),
            (SessionKind::Practice2, &self.second_practice),
            (SessionKind::Practice3, &self.third_practice),
            (SessionKind::SprintQualifying, &self.sprint_qualifying),
            (SessionKind::Sprint, &self.sprint),
            (SessionKind::Qualifying, &self.qualifying),
        ];
        for (kind, slot) in declared {
            if let Some(s) = slot {
                sessions.push((kind, s.clone()));
            }
        }
        sessions.push((
            SessionKind::Race,
            SessionTime {
                date: self.date.clone(),
                time: self.time.clone(),
            },
        ));
        sessions
    }

    /// Main-event sessions with a parseable start instant (countdown input).
    pub fn main_events(&self) -> Vec<(SessionKind, DateTime<Utc>)> {
        self.sessions()
            .into_iter()
            .filter(|(kind, _)| kind.is_main_event())
            .filter_map(|(kind, s)| s.datetime().map(|t| (kind, t)))
            .collect()
    }

    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        parse_session_datetime(&self.date, self.time.as_deref())
    }

    /// Whether the race session has started — the gate for "fetch results
    /// for this weekend" and for the suspect-empty heuristic.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_datetime().map(|t| t <= now).unwrap_or(false)
    }
}

/// One hourly forecast sample, in the upstream's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WeatherSample {
    /// Air temperature in whole °C.
    pub temperature_c: i32,
    /// Precipitation probability, 0–100.
    pub precipitation_probability: u8,
    /// Weather condition code (WMO vocabulary).
    pub weather_code: u16,
}

//! Countdown to the next main event of a race weekend.
//!
//! `next_event` is pure computation over already-fetched schedule data — no
//! network I/O and no failure mode beyond "no next event". A once-per-second
//! background ticker recomputes the countdown for the tracked race and
//! publishes it into shared state for the status endpoint.
//!
//! The tracked race snapshot is set by the schedule routes; the ticker never
//! fetches anything itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::models::{Race, SessionKind};

/// Recompute cadence for the ticker.
const TICK_INTERVAL_SECS: u64 = 1;

/// The next unstarted main event of a race weekend.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NextEvent {
    pub kind: SessionKind,
    /// Display label (e.g. "Sprint Qualifying").
    pub label: String,
    pub starts_at: DateTime<Utc>,
    pub seconds_remaining: i64,
}

/// Ticker snapshot, exposed via the countdown endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountdownState {
    /// The race weekend being tracked (set by the schedule routes).
    pub race: Option<Race>,
    /// Next main event, absent once the weekend has concluded.
    pub next: Option<NextEvent>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CountdownState {
    pub fn new() -> Self {
        Self {
            race: None,
            next: None,
            updated_at: None,
        }
    }
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared countdown state handle.
pub type SharedCountdownState = Arc<RwLock<CountdownState>>;

/// The chronologically earliest main event strictly in the future, or `None`
/// when the weekend has concluded. Practice sessions are never candidates.
pub fn next_event(race: &Race, now: DateTime<Utc>) -> Option<NextEvent> {
    race.main_events()
        .into_iter()
        .filter(|(_, starts_at)| *starts_at > now)
        .min_by_key(|(_, starts_at)| *starts_at)
        .map(|(kind, starts_at)| NextEvent {
            kind,
            label: kind.label().to_string(),
            starts_at,
            seconds_remaining: (starts_at - now).num_seconds(),
        })
}

/// Replace the tracked race and recompute immediately, so the endpoint is
/// correct before the next tick.
pub async fn set_tracked_race(state: &SharedCountdownState, race: Race) {
    let mut s = state.write().await;
    let now = Utc::now();
    s.next = next_event(&race, now);
    s.race = Some(race);
    s.updated_at = Some(now);
}

/// Run the countdown ticker. Never returns; spawn via `tokio::spawn`.
pub async fn run_countdown(state: SharedCountdownState) {
    tracing::info!("Countdown ticker started");
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(TICK_INTERVAL_SECS));

    loop {
        interval.tick().await;
        let mut s = state.write().await;
        let now = Utc::now();
        s.next = s.race.as_ref().and_then(|race| next_event(race, now));
        s.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Circuit, Location, SessionTime};

    fn sprint_weekend() -> Race {
        Race {
            season: 2025,
            round: 6,
            race_name: "Miami Grand Prix".to_string(),
            circuit: Circuit {
                circuit_id: "miami".to_string(),
                circuit_name: "Miami International Autodrome".to_string(),
                location: Location {
                    lat: "25.9581".to_string(),
                    long: "-80.2389".to_string(),
                    locality: "Miami".to_string(),
                    country: "USA".to_string(),
                },
            },
            date: "2025-05-04".to_string(),
            time: Some("20:00:00Z".to_string()),
            first_practice: Some(at("2025-05-02", "16:30:00Z")),
            second_practice: None,
            third_practice: None,
            sprint_qualifying: Some(at("2025-05-02", "20:30:00Z")),
            sprint: Some(at("2025-05-03", "16:00:00Z")),
            qualifying: Some(at("2025-05-03", "20:00:00Z")),
        }
    }

    fn at(date: &str, time: &str) -> SessionTime {
        SessionTime {
            date: date.to_string(),
            time: Some(time.to_string()),
        }
    }

    #[test]
    fn test_next_event_skips_practice() {
        // Before everything: FP1 is first chronologically but is not a main
        // event, so Sprint Qualifying wins.
        let now = "2025-05-02T00:00:00Z".parse().unwrap();
        let next = next_event(&sprint_weekend(), now).unwrap();
        assert_eq!(next.kind, SessionKind::SprintQualifying);
        assert_eq!(next.label, "Sprint Qualifying");
    }

    #[test]
    fn test_next_event_progresses_through_weekend() {
        let race = sprint_weekend();

        let after_sq = "2025-05-03T00:00:00Z".parse().unwrap();
        assert_eq!(next_event(&race, after_sq).unwrap().kind, SessionKind::Sprint);

        let after_sprint = "2025-05-03T17:00:00Z".parse().unwrap();
        assert_eq!(
            next_event(&race, after_sprint).unwrap().kind,
            SessionKind::Qualifying
        );

        let after_qualifying = "2025-05-04T00:00:00Z".parse().unwrap();
        assert_eq!(next_event(&race, after_qualifying).unwrap().kind, SessionKind::Race);
    }

    #[test]
    fn test_next_event_is_strictly_future() {
        // Exactly at race start: the race has started, nothing remains.
        let race = sprint_weekend();
        let at_start = "2025-05-04T20:00:00Z".parse().unwrap();
        assert!(next_event(&race, at_start).is_none());
    }

    #[test]
    fn test_next_event_none_after_weekend() {
        let monday = "2025-05-05T09:00:00Z".parse().unwrap();
        assert!(next_event(&sprint_weekend(), monday).is_none());
    }

    #[test]
    fn test_seconds_remaining() {
        let race = sprint_weekend();
        let now = "2025-05-04T19:59:00Z".parse().unwrap();
        let next = next_event(&race, now).unwrap();
        assert_eq!(next.seconds_remaining, 60);
    }
}

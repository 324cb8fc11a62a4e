//! Session-result fetch orchestration.
//!
//! For one race weekend: fire the race/qualifying(/sprint) requests in
//! parallel, treat an empty race list as a suspected transient failure,
//! retry with exponential backoff, and degrade to an empty committed entry
//! when retries run out. Across race weekends: fan out without re-entering
//! keys the cache already holds in flight.
//!
//! A failed race never aborts the others — each key resolves independently
//! and every failure mode terminates in a well-typed cache entry, not an
//! error reaching the consumer.

use std::time::Duration;

use crate::cache::{ResultCache, SeasonEpoch};
use crate::errors::AppError;
use crate::models::{FetchState, RaceKey, SessionResults};
use crate::services::jolpica::JolpicaClient;

/// Maximum retries after the initial attempt (4 attempts total).
const MAX_RETRIES: u32 = 3;

/// Base backoff delay; doubles per retry (500ms, 1s, 2s).
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Backoff delay before retry `n` (0-indexed): `base × 2^n`.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base * 2u32.pow(retry)
}

/// One attempt's failure mode. Suspect-empty is semantic, not transport:
/// the HTTP call succeeded but a race that has already started reported
/// zero finishers, which upstream only does while still catching up.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Upstream(#[from] AppError),
    #[error("race result list is empty for a started race")]
    SuspectEmptyRace,
}

/// Fetch Orchestrator + Batch Coordinator over the result cache.
#[derive(Clone)]
pub struct ResultsService {
    jolpica: JolpicaClient,
    cache: ResultCache,
    retry_base: Duration,
}

impl ResultsService {
    pub fn new(jolpica: JolpicaClient, cache: ResultCache) -> Self {
        Self {
            jolpica,
            cache,
            retry_base: RETRY_BASE_DELAY,
        }
    }

    /// Override the backoff base delay. The backoff curve stays `base × 2^n`;
    /// tests shrink the base so retry behavior is observable in milliseconds.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Batch coordinator: dispatch a background fetch for every key the
    /// cache doesn't already hold as loading or resolved. Safe to call
    /// repeatedly — re-issuing a batch never duplicates in-flight work.
    ///
    /// Returns the number of fetches actually dispatched.
    pub async fn ensure_loaded(&self, races: &[(RaceKey, bool)]) -> usize {
        let mut dispatched = 0;
        for &(key, has_sprint) in races {
            if let Some(epoch) = self.cache.begin_fetch(key).await {
                dispatched += 1;
                let service = self.clone();
                tokio::spawn(async move {
                    service.load_race(key, has_sprint, epoch).await;
                });
            }
        }
        if dispatched > 0 {
            tracing::info!(
                "Dispatched {} result fetches ({} requested)",
                dispatched,
                races.len()
            );
        }
        dispatched
    }

    /// Explicit user retry for a permanently failed key. Returns whether a
    /// fetch was dispatched (false when the key is not in `FailedPermanently`).
    pub async fn retry_failed(&self, key: RaceKey, has_sprint: bool) -> bool {
        if !self.cache.reset_failed(key).await {
            return false;
        }
        self.ensure_loaded(&[(key, has_sprint)]).await == 1
    }

    /// Drive one claimed key to a committed cache entry. Exhausted retries
    /// commit an empty entry flagged `FailedPermanently` instead of
    /// propagating the error.
    async fn load_race(&self, key: RaceKey, has_sprint: bool, epoch: SeasonEpoch) {
        match self.fetch_race_results(key, has_sprint).await {
            Ok(results) => {
                if self
                    .cache
                    .commit(key, epoch, FetchState::Succeeded, results)
                    .await
                {
                    tracing::info!("Results cached for {}", key);
                }
            }
            Err(e) => {
                tracing::error!("Result fetch failed permanently for {}: {}", key, e);
                self.cache
                    .commit(
                        key,
                        epoch,
                        FetchState::FailedPermanently,
                        SessionResults::default(),
                    )
                    .await;
            }
        }
    }

    /// Fetch all applicable session results for one race weekend, retrying
    /// on transport failure or a suspect-empty race list.
    ///
    /// Backoff sleeps suspend only this key's task; other keys' fetches keep
    /// running.
    pub async fn fetch_race_results(
        &self,
        key: RaceKey,
        has_sprint: bool,
    ) -> Result<SessionResults, AppError> {
        let mut last_err: Option<AttemptError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base, attempt - 1);
                tracing::warn!(
                    "Retrying result fetch for {} in {:?} (attempt {}/{})",
                    key,
                    delay,
                    attempt + 1,
                    MAX_RETRIES + 1
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt_fetch(key, has_sprint).await {
                Ok(results) => return Ok(results),
                Err(e) => {
                    tracing::warn!("Result fetch attempt {} failed for {}: {}", attempt + 1, key, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(AttemptError::Upstream(e)) => e,
            Some(AttemptError::SuspectEmptyRace) | None => AppError::ExternalServiceError(format!(
                "race results for {} still empty after {} attempts",
                key,
                MAX_RETRIES + 1
            )),
        })
    }

    /// One attempt: all applicable session requests in parallel; returns
    /// only once every request has resolved.
    async fn attempt_fetch(
        &self,
        key: RaceKey,
        has_sprint: bool,
    ) -> Result<SessionResults, AttemptError> {
        let sprint_fut = async {
            if has_sprint {
                self.jolpica.sprint_results(key).await
            } else {
                Ok(Vec::new())
            }
        };

        let (race, qualifying, sprint) = futures::join!(
            self.jolpica.race_results(key),
            self.jolpica.qualifying_results(key),
            sprint_fut
        );

        let race = race?;
        // An empty qualifying (or sprint) list is taken at face value —
        // availability upstream is looser for those sessions. Only the race
        // list triggers the suspect-empty path.
        let qualifying = qualifying?;
        let sprint = sprint?;

        if race.is_empty() {
            return Err(AttemptError::SuspectEmptyRace);
        }

        Ok(SessionResults {
            race,
            qualifying,
            sprint,
        })
    }
}

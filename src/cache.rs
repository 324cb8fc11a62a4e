//! In-memory result cache with per-key fetch lifecycle.
//!
//! Maps a `RaceKey` to its committed `SessionResults` plus a `FetchState`.
//! The check-and-set in `begin_fetch` is the dedupe guard: at most one
//! in-flight fetch per key, no matter how often callers re-issue the batch.
//!
//! Season switches clear the whole map and bump an epoch token. Fetches
//! capture the epoch at dispatch and present it at commit; a commit carrying
//! a stale epoch is dropped silently, so a fetch dispatched under the old
//! season can never write into the new season's key space.
//!
//! Entries are only ever committed whole — a reader sees either the prior
//! state or the fully-resolved new one, never a race list without its
//! qualifying list.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{FetchState, RaceKey, SessionResults};

/// Epoch token captured at dispatch time and checked at commit time.
pub type SeasonEpoch = u64;

#[derive(Debug, Clone)]
struct CacheEntry {
    state: FetchState,
    results: SessionResults,
}

#[derive(Debug, Default)]
struct CacheInner {
    epoch: SeasonEpoch,
    season: Option<u16>,
    entries: HashMap<RaceKey, CacheEntry>,
}

/// Shared handle to the result cache. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the active season. When the season actually changes, every
    /// entry is cleared wholesale and the epoch is bumped, invalidating any
    /// fetch still in flight. Returns the epoch now in effect.
    pub async fn set_season(&self, season: u16) -> SeasonEpoch {
        let mut inner = self.inner.write().await;
        if inner.season != Some(season) {
            inner.season = Some(season);
            inner.epoch += 1;
            inner.entries.clear();
            tracing::info!(
                "Result cache switched to season {} (epoch {})",
                season,
                inner.epoch
            );
        }
        inner.epoch
    }

    /// Atomically claim a key for fetching.
    ///
    /// Returns the epoch to commit with, or `None` when the key must not be
    /// dispatched: already loading, already resolved, or permanently failed
    /// (failed keys are only re-entered through [`reset_failed`], the
    /// explicit user retry).
    ///
    /// [`reset_failed`]: ResultCache::reset_failed
    pub async fn begin_fetch(&self, key: RaceKey) -> Option<SeasonEpoch> {
        let mut inner = self.inner.write().await;
        match inner.entries.get(&key).map(|e| e.state) {
            Some(FetchState::Loading)
            | Some(FetchState::Succeeded)
            | Some(FetchState::FailedPermanently) => None,
            Some(FetchState::NotStarted) | None => {
                let epoch = inner.epoch;
                inner.entries.insert(
                    key,
                    CacheEntry {
                        state: FetchState::Loading,
                        results: SessionResults::default(),
                    },
                );
                Some(epoch)
            }
        }
    }

    /// Commit a resolved fetch. Returns `false` (and changes nothing) when
    /// `epoch` is stale — the season changed while the fetch was in flight.
    pub async fn commit(
        &self,
        key: RaceKey,
        epoch: SeasonEpoch,
        state: FetchState,
        results: SessionResults,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if inner.epoch != epoch {
            tracing::debug!(
                "Dropping stale commit for {} (epoch {} != {})",
                key,
                epoch,
                inner.epoch
            );
            return false;
        }
        inner.entries.insert(key, CacheEntry { state, results });
        true
    }

    /// Non-blocking read. Unknown keys read as `NotStarted` with empty
    /// results.
    pub async fn get(&self, key: RaceKey) -> (SessionResults, FetchState) {
        let inner = self.inner.read().await;
        match inner.entries.get(&key) {
            Some(e) => (e.results.clone(), e.state),
            None => (SessionResults::default(), FetchState::NotStarted),
        }
    }

    /// Reset a permanently failed key back to `NotStarted` so an explicit
    /// user retry can re-dispatch it. Returns `false` for keys in any other
    /// state.
    pub async fn reset_failed(&self, key: RaceKey) -> bool {
        let mut inner = self.inner.write().await;
        match inner.entries.get(&key).map(|e| e.state) {
            Some(FetchState::FailedPermanently) => {
                inner.entries.insert(
                    key,
                    CacheEntry {
                        state: FetchState::NotStarted,
                        results: SessionResults::default(),
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// Number of keys with any recorded state.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn season(&self) -> Option<u16> {
        self.inner.read().await.season
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(round: u8) -> RaceKey {
        RaceKey::new(2025, round)
    }

    fn non_empty_results() -> SessionResults {
        SessionResults {
            race: vec![crate::models::SessionResult {
                position: Some(1),
                driver_id: "verstappen".to_string(),
                driver_name: "Max Verstappen".to_string(),
                constructor_id: "red_bull".to_string(),
                constructor_name: "Red Bull".to_string(),
                points: Some(25.0),
                time: Some("1:28:01.1".to_string()),
                status: Some("Finished".to_string()),
                fastest_lap: None,
            }],
            qualifying: vec![],
            sprint: vec![],
        }
    }

    #[tokio::test]
    async fn test_begin_fetch_claims_key_once() {
        let cache = ResultCache::new();
        cache.set_season(2025).await;

        assert!(cache.begin_fetch(key(1)).await.is_some());
        assert!(
            cache.begin_fetch(key(1)).await.is_none(),
            "key already Loading must not be claimed twice"
        );
        // A different key is unaffected
        assert!(cache.begin_fetch(key(2)).await.is_some());
    }

    #[tokio::test]
    async fn test_succeeded_key_is_never_reclaimed() {
        let cache = ResultCache::new();
        let epoch = cache.set_season(2025).await;

        cache.begin_fetch(key(1)).await.unwrap();
        cache
            .commit(key(1), epoch, FetchState::Succeeded, non_empty_results())
            .await;

        assert!(cache.begin_fetch(key(1)).await.is_none());
        let (results, state) = cache.get(key(1)).await;
        assert_eq!(state, FetchState::Succeeded);
        assert_eq!(results.race.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_epoch_commit_is_dropped() {
        let cache = ResultCache::new();
        cache.set_season(2024).await;
        let old_epoch = cache.begin_fetch(key(1)).await.unwrap();

        // Season switch while the fetch is "in flight"
        cache.set_season(2025).await;

        let committed = cache
            .commit(key(1), old_epoch, FetchState::Succeeded, non_empty_results())
            .await;
        assert!(!committed, "stale-epoch commit must be dropped");

        let (_, state) = cache.get(key(1)).await;
        assert_eq!(state, FetchState::NotStarted);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_set_season_same_season_keeps_entries() {
        let cache = ResultCache::new();
        let epoch = cache.set_season(2025).await;
        cache.begin_fetch(key(1)).await.unwrap();
        cache
            .commit(key(1), epoch, FetchState::Succeeded, non_empty_results())
            .await;

        let epoch_again = cache.set_season(2025).await;
        assert_eq!(epoch, epoch_again, "same season must not bump the epoch");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_failed_only_applies_to_failed_keys() {
        let cache = ResultCache::new();
        let epoch = cache.set_season(2025).await;

        cache.begin_fetch(key(1)).await.unwrap();
        cache
            .commit(
                key(1),
                epoch,
                FetchState::FailedPermanently,
                SessionResults::default(),
            )
            .await;

        // Failed keys are not re-entered by the batch path...
        assert!(cache.begin_fetch(key(1)).await.is_none());
        // ...only by the explicit reset.
        assert!(cache.reset_failed(key(1)).await);
        assert!(cache.begin_fetch(key(1)).await.is_some());

        // Reset on a loading key is refused
        assert!(!cache.reset_failed(key(1)).await);
        // Reset on an unknown key is refused
        assert!(!cache.reset_failed(key(9)).await);
    }
}

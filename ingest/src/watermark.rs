//! What earlier runs already persisted.
//!
//! Every lookup falls back to "nothing persisted yet" when its query fails, so
//! the pipeline can start against an empty or half provisioned database.

use std::collections::HashSet;

use crate::storage::Storage;

/// Known state at the start of a run.
///
/// Taken once per run and never updated while the run progresses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watermark {
    pub initial_load: bool,
    pub latest_match_time: i64,
    pub match_ids: HashSet<i64>,
    pub team_ids: HashSet<i64>,
    pub player_ids: HashSet<i64>,
}

impl Watermark {
    /// Whether a candidate counts as new relative to this watermark.
    pub fn is_new(&self, match_id: i64, start_time: i64) -> bool {
        !self.match_ids.contains(&match_id) && start_time > self.latest_match_time
    }
}

pub struct WatermarkStore<'s, S: ?Sized> {
    storage: &'s mut S,
}

impl<'s, S> WatermarkStore<'s, S>
where
    S: Storage + ?Sized,
{
    pub fn new(storage: &'s mut S) -> Self {
        Self { storage }
    }

    pub async fn latest_match_time(&mut self) -> i64 {
        match self.storage.latest_fact_match_time().await {
            Ok(latest) => latest.unwrap_or(0),
            Err(e) => {
                tracing::warn!("Loading latest match time, assuming none: {}", e);
                0
            }
        }
    }

    pub async fn existing_match_ids(&mut self) -> HashSet<i64> {
        self.storage.fact_match_ids().await.unwrap_or_else(|e| {
            tracing::warn!("Loading existing match ids, assuming none: {}", e);
            HashSet::new()
        })
    }

    pub async fn existing_team_ids(&mut self) -> HashSet<i64> {
        self.storage.dim_team_ids().await.unwrap_or_else(|e| {
            tracing::warn!("Loading existing team ids, assuming none: {}", e);
            HashSet::new()
        })
    }

    pub async fn existing_player_ids(&mut self) -> HashSet<i64> {
        self.storage.dim_player_ids().await.unwrap_or_else(|e| {
            tracing::warn!("Loading existing player ids, assuming none: {}", e);
            HashSet::new()
        })
    }

    /// True while the match fact table is missing or empty.
    pub async fn is_initial_load(&mut self) -> bool {
        match self.storage.fact_match_count().await {
            Ok(count) => count == 0,
            Err(e) => {
                tracing::warn!("Counting fact matches, assuming initial load: {}", e);
                true
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn snapshot(&mut self) -> Watermark {
        let watermark = Watermark {
            initial_load: self.is_initial_load().await,
            latest_match_time: self.latest_match_time().await,
            match_ids: self.existing_match_ids().await,
            team_ids: self.existing_team_ids().await,
            player_ids: self.existing_player_ids().await,
        };

        tracing::info!(
            initial_load = watermark.initial_load,
            latest_match_time = %format_timestamp(watermark.latest_match_time),
            matches = watermark.match_ids.len(),
            teams = watermark.team_ids.len(),
            players = watermark.player_ids.len(),
            "Loaded watermark"
        );

        watermark
    }
}

pub(crate) fn format_timestamp(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(ts) => ts.to_rfc3339(),
        None => secs.to_string(),
    }
}

use std::collections::HashSet;

use common::opendota::{MatchDetails, MatchSummary, PlayerProfile, Team};
use common::{LoadMode, LoadOrder, RunReport};

use crate::fetch::Source;
use crate::loader::Loader;
use crate::pacer::Pacer;
use crate::storage::Storage;
use crate::watermark::{Watermark, WatermarkStore};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Team whose match history is followed.
    pub team_id: i64,
    pub match_limit: Option<usize>,
    pub candidate_depth: Option<usize>,
    pub order: LoadOrder,
    /// Fetch `/players/{id}` for new players instead of staging the
    /// participant data embedded in the match.
    pub fetch_player_profiles: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            team_id: 2163,
            match_limit: None,
            candidate_depth: None,
            order: LoadOrder::NewestFirst,
            fetch_player_profiles: false,
        }
    }
}

/// Volume and ordering of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub mode: LoadMode,
    pub depth: usize,
    pub limit: usize,
    pub order: LoadOrder,
}

impl Plan {
    pub const INITIAL_DEPTH: usize = 100;
    pub const INITIAL_LIMIT: usize = 50;
    pub const INCREMENTAL_DEPTH: usize = 20;
    pub const INCREMENTAL_LIMIT: usize = 3;

    pub fn resolve(initial_load: bool, settings: &Settings) -> Self {
        let (mode, depth, limit) = if initial_load {
            (LoadMode::Initial, Self::INITIAL_DEPTH, Self::INITIAL_LIMIT)
        } else {
            (
                LoadMode::Incremental,
                Self::INCREMENTAL_DEPTH,
                Self::INCREMENTAL_LIMIT,
            )
        };

        Self {
            mode,
            depth: settings.candidate_depth.unwrap_or(depth),
            limit: settings.match_limit.unwrap_or(limit),
            order: settings.order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub match_id: i64,
    pub start_time: i64,
}

/// Orders the candidates, keeps the ones newer than the watermark and caps
/// them at the plan's limit.
pub fn select_new(
    candidates: Vec<MatchSummary>,
    watermark: &Watermark,
    plan: &Plan,
) -> Vec<Candidate> {
    let total = candidates.len();
    let mut candidates: Vec<Candidate> = candidates
        .into_iter()
        .filter_map(|m| match (m.match_id, m.start_time) {
            (Some(match_id), Some(start_time)) => Some(Candidate {
                match_id,
                start_time,
            }),
            _ => None,
        })
        .collect();
    if candidates.len() != total {
        tracing::warn!(
            "Dropped {} candidates without a match id or start time",
            total - candidates.len()
        );
    }

    match plan.order {
        LoadOrder::OldestFirst => candidates.sort_by_key(|c| c.start_time),
        LoadOrder::NewestFirst => candidates.sort_by_key(|c| std::cmp::Reverse(c.start_time)),
    }

    let mut selected: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| watermark.is_new(c.match_id, c.start_time))
        .collect();
    selected.truncate(plan.limit);

    selected
}

/// Players and teams referenced by a batch of matches that are not known yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derived {
    pub players: Vec<PlayerProfile>,
    pub team_ids: Vec<i64>,
}

pub fn extract_derived(matches: &[MatchDetails], watermark: &Watermark) -> Derived {
    let mut player_ids = HashSet::new();
    let mut team_ids = HashSet::new();
    let mut derived = Derived::default();

    for details in matches {
        for player in details.players() {
            let profile = match player.profile() {
                Some(p) => p,
                None => continue,
            };

            let id = profile.account_id();
            if watermark.player_ids.contains(&id) || !player_ids.insert(id) {
                continue;
            }

            derived.players.push(profile);
        }

        for team_id in details.team_ids() {
            if watermark.team_ids.contains(&team_id) || !team_ids.insert(team_id) {
                continue;
            }

            derived.team_ids.push(team_id);
        }
    }

    derived
}

pub struct Pipeline {
    settings: Settings,
    pacer: Pacer,
}

impl Pipeline {
    pub fn new(settings: Settings, pacer: Pacer) -> Self {
        Self { settings, pacer }
    }

    #[tracing::instrument(name = "pipeline", skip_all, fields(team_id = self.settings.team_id))]
    pub async fn run<A, S>(&self, source: &A, storage: &mut S) -> crate::Result<RunReport>
    where
        A: Source + ?Sized,
        S: Storage + ?Sized,
    {
        let started = std::time::Instant::now();
        let calls_before = source.api_calls();

        let watermark = WatermarkStore::new(&mut *storage).snapshot().await;
        let plan = Plan::resolve(watermark.initial_load, &self.settings);
        tracing::info!(
            mode = ?plan.mode,
            order = ?plan.order,
            depth = plan.depth,
            limit = plan.limit,
            "Determined load mode"
        );

        let mut report = RunReport::empty(plan.mode);

        let candidates = source.team_matches(self.settings.team_id, plan.depth).await;
        report.candidates = candidates.len();

        let selected = select_new(candidates, &watermark, &plan);
        report.new_matches = selected.len();
        tracing::info!(
            "{} of {} candidates are newer than {}",
            selected.len(),
            report.candidates,
            crate::watermark::format_timestamp(watermark.latest_match_time)
        );

        if selected.is_empty() {
            tracing::info!("No new matches to process");
            report.api_calls = source.api_calls().saturating_sub(calls_before);
            return Ok(report);
        }

        let details = self.fetch_details(source, &selected).await;
        let derived = extract_derived(&details, &watermark);
        tracing::info!(
            matches = details.len(),
            players = derived.players.len(),
            teams = derived.team_ids.len(),
            "Fetched match details"
        );

        let mut loader = Loader::new(&mut *storage);

        report.matches_stored = loader.store_matches(&details).await?;

        let players = self.player_profiles(source, derived.players).await;
        report.players_stored = loader.store_players(players).await?;

        let teams = self.fetch_teams(source, &derived.team_ids).await;
        report.teams_stored = loader.store_teams(&teams).await?;

        report.heroes_stored = self.refresh_heroes(source, &mut loader).await?;

        report.api_calls = source.api_calls().saturating_sub(calls_before);
        tracing::info!(
            matches = report.matches_stored,
            players = report.players_stored,
            teams = report.teams_stored,
            heroes = report.heroes_stored,
            api_calls = report.api_calls,
            elapsed = ?started.elapsed(),
            "Stored new data"
        );

        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(matches = selected.len()))]
    async fn fetch_details<A>(&self, source: &A, selected: &[Candidate]) -> Vec<MatchDetails>
    where
        A: Source + ?Sized,
    {
        let mut details = Vec::with_capacity(selected.len());

        for (i, candidate) in selected.iter().enumerate() {
            if i > 0 {
                self.pacer.between_matches().await;
            }

            match source.match_details(candidate.match_id).await {
                Some(d) => details.push(d),
                None => {
                    tracing::warn!(
                        "Skipping match {} due to timeout or missing data",
                        candidate.match_id
                    );
                }
            };
        }

        details
    }

    async fn player_profiles<A>(
        &self,
        source: &A,
        players: Vec<PlayerProfile>,
    ) -> Vec<PlayerProfile>
    where
        A: Source + ?Sized,
    {
        if !self.settings.fetch_player_profiles {
            return players;
        }

        let mut profiles = Vec::with_capacity(players.len());
        for envelope in players {
            self.pacer.before_player().await;

            match source.player_info(envelope.account_id()).await {
                Some(p) if p.account_id() == envelope.account_id() => profiles.push(p),
                _ => {
                    tracing::debug!(
                        "Using match data for player {}",
                        envelope.account_id()
                    );
                    profiles.push(envelope);
                }
            }
        }

        profiles
    }

    async fn fetch_teams<A>(&self, source: &A, team_ids: &[i64]) -> Vec<Team>
    where
        A: Source + ?Sized,
    {
        let mut teams = Vec::with_capacity(team_ids.len());

        for team_id in team_ids {
            match source.team_info(*team_id).await {
                Some(t) => teams.push(t),
                None => tracing::warn!("Skipping team {} due to missing data", team_id),
            };
        }

        teams
    }

    async fn refresh_heroes<A, S>(
        &self,
        source: &A,
        loader: &mut Loader<'_, S>,
    ) -> crate::Result<usize>
    where
        A: Source + ?Sized,
        S: Storage + ?Sized,
    {
        let staged = loader.staged_hero_count().await?;
        if staged > 0 {
            tracing::debug!("{} heroes already staged, keeping them", staged);
            return Ok(0);
        }

        let heroes = source.heroes().await;
        if heroes.is_empty() {
            tracing::warn!("No hero data retrieved");
            return Ok(0);
        }

        tracing::info!("Retrieved {} heroes", heroes.len());
        loader.replace_heroes(&heroes).await
    }
}

use std::collections::HashSet;

use common::opendota::{Hero, MatchDetails, PlayerProfile, Team};

use crate::models::{StagedHero, StagedMatch, StagedPlayer, StagedTeam};
use crate::storage::Storage;

/// Keeps the first profile per account id and drops anonymous accounts.
pub fn dedup_players<I>(players: I) -> Vec<PlayerProfile>
where
    I: IntoIterator<Item = PlayerProfile>,
{
    let mut seen = HashSet::new();
    players
        .into_iter()
        .filter(|p| {
            let id = p.account_id();
            id != 0 && id != common::ANONYMOUS_ACCOUNT_ID && seen.insert(id)
        })
        .collect()
}

/// Writes fetched records into staging, skipping anything already staged.
pub struct Loader<'s, S: ?Sized> {
    storage: &'s mut S,
}

impl<'s, S> Loader<'s, S>
where
    S: Storage + ?Sized,
{
    pub fn new(storage: &'s mut S) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip_all, fields(matches = matches.len()))]
    pub async fn store_matches(&mut self, matches: &[MatchDetails]) -> crate::Result<usize> {
        if matches.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = matches.iter().map(|m| m.match_id).collect();
        let mut staged = self.storage.staged_match_ids(&ids).await?;

        let mut rows = Vec::with_capacity(matches.len());
        for details in matches {
            // `insert` also catches duplicates inside the batch
            if !staged.insert(details.match_id) {
                continue;
            }

            rows.push(StagedMatch {
                match_id: details.match_id,
                raw_json: details.raw.clone(),
            });
        }

        tracing::debug!(
            "Inserting {} new matches (skipped {} already staged)",
            rows.len(),
            matches.len() - rows.len()
        );

        if rows.is_empty() {
            return Ok(0);
        }

        self.storage.insert_matches(rows).await
    }

    #[tracing::instrument(skip_all, fields(teams = teams.len()))]
    pub async fn store_teams(&mut self, teams: &[Team]) -> crate::Result<usize> {
        if teams.is_empty() {
            return Ok(0);
        }

        let mut staged = self.storage.staged_team_ids().await?;

        let mut rows = Vec::with_capacity(teams.len());
        for team in teams {
            if !staged.insert(team.team_id) {
                continue;
            }

            rows.push(StagedTeam {
                team_id: team.team_id,
                raw_json: serde_json::to_value(team)?,
            });
        }

        tracing::debug!(
            "Inserting {} new teams (skipped {} duplicates)",
            rows.len(),
            teams.len() - rows.len()
        );

        if rows.is_empty() {
            return Ok(0);
        }

        self.storage.insert_teams(rows).await
    }

    #[tracing::instrument(skip_all, fields(players = players.len()))]
    pub async fn store_players(&mut self, players: Vec<PlayerProfile>) -> crate::Result<usize> {
        if players.is_empty() {
            return Ok(0);
        }

        let total = players.len();
        let unique = dedup_players(players);
        let staged = self.storage.staged_player_ids().await?;

        let mut rows = Vec::with_capacity(unique.len());
        for player in unique.iter().filter(|p| !staged.contains(&p.account_id())) {
            rows.push(StagedPlayer {
                account_id: player.account_id(),
                raw_json: player.raw.clone(),
            });
        }

        tracing::debug!(
            "Inserting {} new players (skipped {} duplicates)",
            rows.len(),
            total - rows.len()
        );

        if rows.is_empty() {
            return Ok(0);
        }

        self.storage.insert_players(rows).await
    }

    pub async fn staged_hero_count(&mut self) -> crate::Result<i64> {
        self.storage.staged_hero_count().await
    }

    /// Replaces the staged hero reference data.
    #[tracing::instrument(skip_all, fields(heroes = heroes.len()))]
    pub async fn replace_heroes(&mut self, heroes: &[Hero]) -> crate::Result<usize> {
        if heroes.is_empty() {
            return Ok(0);
        }

        let rows = heroes
            .iter()
            .map(|hero| {
                Ok(StagedHero {
                    hero_id: hero.id,
                    raw_json: serde_json::to_value(hero)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        self.storage.replace_heroes(rows).await
    }
}

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use common::opendota::{Hero, MatchDetails, MatchSummary, PlayerProfile, Team};
use ingest::models::{StagedHero, StagedMatch, StagedPlayer, StagedTeam};

fn missing_table(name: &str) -> ingest::Error {
    ingest::Error::Database(diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::Unknown,
        Box::new(format!("relation \"{}\" does not exist", name)),
    ))
}

/// In memory stand-in for the staging database.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// `(match_id, start_time)` rows, `None` while the table does not exist.
    pub fact_matches: Option<Vec<(i64, i64)>>,
    pub dim_teams: Option<Vec<i64>>,
    pub dim_players: Option<Vec<i64>>,

    pub stg_matches: Vec<StagedMatch>,
    pub stg_teams: Vec<StagedTeam>,
    pub stg_players: Vec<StagedPlayer>,
    pub stg_heroes: Vec<StagedHero>,

    pub fail_writes: bool,
    pub queries: usize,
    pub commits: usize,
}

impl MemoryStorage {
    /// A database where all tables exist but are empty.
    pub fn provisioned() -> Self {
        Self {
            fact_matches: Some(Vec::new()),
            dim_teams: Some(Vec::new()),
            dim_players: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Does what the downstream transformation does with staged rows.
    pub fn promote(&mut self) {
        let facts = self.fact_matches.get_or_insert_with(Vec::new);
        for row in self.stg_matches.iter() {
            if facts.iter().any(|(id, _)| *id == row.match_id) {
                continue;
            }
            let start_time = row.raw_json["start_time"].as_i64().unwrap_or(0);
            facts.push((row.match_id, start_time));
        }

        let teams = self.dim_teams.get_or_insert_with(Vec::new);
        for row in self.stg_teams.iter() {
            if !teams.contains(&row.team_id) {
                teams.push(row.team_id);
            }
        }

        let players = self.dim_players.get_or_insert_with(Vec::new);
        for row in self.stg_players.iter() {
            if !players.contains(&row.account_id) {
                players.push(row.account_id);
            }
        }
    }

    pub fn staged_rows(&self) -> usize {
        self.stg_matches.len() + self.stg_teams.len() + self.stg_players.len() + self.stg_heroes.len()
    }

    fn write(&mut self) -> ingest::Result<()> {
        if self.fail_writes {
            return Err(ingest::Error::Database(
                diesel::result::Error::RollbackTransaction,
            ));
        }
        self.commits += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ingest::storage::Storage for MemoryStorage {
    async fn fact_match_count(&mut self) -> ingest::Result<i64> {
        self.queries += 1;
        let facts = self.fact_matches.as_ref().ok_or_else(|| missing_table("fact_matches"))?;
        Ok(facts.len() as i64)
    }

    async fn latest_fact_match_time(&mut self) -> ingest::Result<Option<i64>> {
        self.queries += 1;
        let facts = self.fact_matches.as_ref().ok_or_else(|| missing_table("fact_matches"))?;
        Ok(facts.iter().map(|(_, start)| *start).max())
    }

    async fn fact_match_ids(&mut self) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        let facts = self.fact_matches.as_ref().ok_or_else(|| missing_table("fact_matches"))?;
        Ok(facts.iter().map(|(id, _)| *id).collect())
    }

    async fn dim_team_ids(&mut self) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        let teams = self.dim_teams.as_ref().ok_or_else(|| missing_table("dim_teams"))?;
        Ok(teams.iter().copied().collect())
    }

    async fn dim_player_ids(&mut self) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        let players = self.dim_players.as_ref().ok_or_else(|| missing_table("dim_players"))?;
        Ok(players.iter().copied().collect())
    }

    async fn staged_match_ids(&mut self, match_ids: &[i64]) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        Ok(self
            .stg_matches
            .iter()
            .map(|m| m.match_id)
            .filter(|id| match_ids.contains(id))
            .collect())
    }

    async fn staged_team_ids(&mut self) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        Ok(self.stg_teams.iter().map(|t| t.team_id).collect())
    }

    async fn staged_player_ids(&mut self) -> ingest::Result<HashSet<i64>> {
        self.queries += 1;
        Ok(self.stg_players.iter().map(|p| p.account_id).collect())
    }

    async fn staged_hero_count(&mut self) -> ingest::Result<i64> {
        self.queries += 1;
        Ok(self.stg_heroes.len() as i64)
    }

    async fn insert_matches(&mut self, rows: Vec<StagedMatch>) -> ingest::Result<usize> {
        self.write()?;
        let written = rows.len();
        self.stg_matches.extend(rows);
        Ok(written)
    }

    async fn insert_teams(&mut self, rows: Vec<StagedTeam>) -> ingest::Result<usize> {
        self.write()?;
        let written = rows.len();
        self.stg_teams.extend(rows);
        Ok(written)
    }

    async fn insert_players(&mut self, rows: Vec<StagedPlayer>) -> ingest::Result<usize> {
        self.write()?;
        let written = rows.len();
        self.stg_players.extend(rows);
        Ok(written)
    }

    async fn replace_heroes(&mut self, rows: Vec<StagedHero>) -> ingest::Result<usize> {
        self.write()?;
        let written = rows.len();
        self.stg_heroes = rows;
        Ok(written)
    }
}

/// Upstream API with canned responses that records every request.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub summaries: Vec<MatchSummary>,
    pub details: HashMap<i64, MatchDetails>,
    pub teams: HashMap<i64, Team>,
    pub profiles: HashMap<i64, PlayerProfile>,
    pub heroes: Vec<Hero>,

    requests: Mutex<Vec<String>>,
    calls: AtomicU64,
}

impl ScriptedSource {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requested paths starting with `prefix`.
    pub fn requested(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with(prefix))
            .collect()
    }

    pub fn with_match(mut self, details: MatchDetails) -> Self {
        self.summaries
            .push(summary(details.match_id, details.start_time.unwrap_or(0)));
        for team_id in details.team_ids() {
            self.teams.entry(team_id).or_insert_with(|| team(team_id));
        }
        self.details.insert(details.match_id, details);
        self
    }

    fn record<T>(&self, path: String, response: Option<T>) -> Option<T> {
        self.requests.lock().unwrap().push(path);
        if response.is_some() {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
        response
    }
}

#[async_trait::async_trait]
impl ingest::fetch::Source for ScriptedSource {
    async fn team_matches(&self, team_id: i64, depth: usize) -> Vec<MatchSummary> {
        let mut summaries = self.summaries.clone();
        summaries.truncate(depth);
        let response = Some(summaries).filter(|s| !s.is_empty());
        self.record(format!("teams/{}/matches", team_id), response)
            .unwrap_or_default()
    }

    async fn match_details(&self, match_id: i64) -> Option<MatchDetails> {
        self.record(
            format!("matches/{}", match_id),
            self.details.get(&match_id).cloned(),
        )
    }

    async fn team_info(&self, team_id: i64) -> Option<Team> {
        self.record(format!("teams/{}", team_id), self.teams.get(&team_id).cloned())
    }

    async fn player_info(&self, account_id: i64) -> Option<PlayerProfile> {
        self.record(
            format!("players/{}", account_id),
            self.profiles.get(&account_id).cloned(),
        )
    }

    async fn heroes(&self) -> Vec<Hero> {
        let response = Some(self.heroes.clone()).filter(|h| !h.is_empty());
        self.record("heroes".to_owned(), response).unwrap_or_default()
    }

    fn api_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

pub fn summary(match_id: i64, start_time: i64) -> MatchSummary {
    serde_json::from_value(serde_json::json!({
        "match_id": match_id,
        "start_time": start_time,
        "radiant_win": true,
    }))
    .unwrap()
}

pub fn details(
    match_id: i64,
    start_time: i64,
    teams: (Option<i64>, Option<i64>),
    account_ids: &[i64],
) -> MatchDetails {
    let players: Vec<serde_json::Value> = account_ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "account_id": id,
                "personaname": format!("player-{}", id),
                "kills": 3,
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "match_id": match_id,
        "start_time": start_time,
        "radiant_team_id": teams.0,
        "dire_team_id": teams.1,
        "duration": 2400,
        "players": players,
    }))
    .unwrap()
}

pub fn team(team_id: i64) -> Team {
    serde_json::from_value(serde_json::json!({
        "team_id": team_id,
        "name": format!("team-{}", team_id),
        "rating": 1500.0,
    }))
    .unwrap()
}

pub fn hero(id: i64) -> Hero {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "localized_name": format!("hero-{}", id),
        "roles": ["Carry"],
    }))
    .unwrap()
}

pub fn staged_hero(id: i64) -> StagedHero {
    StagedHero {
        hero_id: id,
        raw_json: serde_json::to_value(hero(id)).unwrap(),
    }
}

pub fn staged_match(match_id: i64, start_time: i64) -> StagedMatch {
    StagedMatch {
        match_id,
        raw_json: serde_json::json!({ "match_id": match_id, "start_time": start_time }),
    }
}

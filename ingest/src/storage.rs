use std::collections::HashSet;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::{StagedHero, StagedMatch, StagedPlayer, StagedTeam};

/// The database the pipeline reads its watermark from and stages into.
///
/// Every insert runs in its own transaction.
#[async_trait::async_trait]
pub trait Storage: Send {
    async fn fact_match_count(&mut self) -> crate::Result<i64>;

    /// Latest `start_time` in the fact table, `None` when it is empty.
    async fn latest_fact_match_time(&mut self) -> crate::Result<Option<i64>>;

    async fn fact_match_ids(&mut self) -> crate::Result<HashSet<i64>>;

    async fn dim_team_ids(&mut self) -> crate::Result<HashSet<i64>>;

    async fn dim_player_ids(&mut self) -> crate::Result<HashSet<i64>>;

    /// The subset of `match_ids` that is already staged.
    async fn staged_match_ids(&mut self, match_ids: &[i64]) -> crate::Result<HashSet<i64>>;

    async fn staged_team_ids(&mut self) -> crate::Result<HashSet<i64>>;

    async fn staged_player_ids(&mut self) -> crate::Result<HashSet<i64>>;

    async fn staged_hero_count(&mut self) -> crate::Result<i64>;

    async fn insert_matches(&mut self, rows: Vec<StagedMatch>) -> crate::Result<usize>;

    async fn insert_teams(&mut self, rows: Vec<StagedTeam>) -> crate::Result<usize>;

    async fn insert_players(&mut self, rows: Vec<StagedPlayer>) -> crate::Result<usize>;

    /// Replaces all staged heroes with `rows`.
    async fn replace_heroes(&mut self, rows: Vec<StagedHero>) -> crate::Result<usize>;
}

pub struct PgStorage {
    con: diesel_async::AsyncPgConnection,
}

impl PgStorage {
    pub fn new(con: diesel_async::AsyncPgConnection) -> Self {
        Self { con }
    }
}

#[async_trait::async_trait]
impl Storage for PgStorage {
    async fn fact_match_count(&mut self) -> crate::Result<i64> {
        let query = crate::schema::fact_matches::dsl::fact_matches.count();
        Ok(query.get_result(&mut self.con).await?)
    }

    async fn latest_fact_match_time(&mut self) -> crate::Result<Option<i64>> {
        let query = crate::schema::fact_matches::dsl::fact_matches
            .select(diesel::dsl::max(crate::schema::fact_matches::dsl::start_time));
        Ok(query.get_result(&mut self.con).await?)
    }

    async fn fact_match_ids(&mut self) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::fact_matches::dsl::fact_matches
            .select(crate::schema::fact_matches::dsl::match_id);
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn dim_team_ids(&mut self) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::dim_teams::dsl::dim_teams
            .select(crate::schema::dim_teams::dsl::team_id);
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn dim_player_ids(&mut self) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::dim_players::dsl::dim_players
            .select(crate::schema::dim_players::dsl::account_id);
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn staged_match_ids(&mut self, match_ids: &[i64]) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::stg_matches::dsl::stg_matches
            .select(crate::schema::stg_matches::dsl::match_id)
            .filter(crate::schema::stg_matches::dsl::match_id.eq_any(match_ids))
            .distinct();
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn staged_team_ids(&mut self) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::stg_teams::dsl::stg_teams
            .select(crate::schema::stg_teams::dsl::team_id)
            .distinct();
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn staged_player_ids(&mut self) -> crate::Result<HashSet<i64>> {
        let query = crate::schema::stg_players::dsl::stg_players
            .select(crate::schema::stg_players::dsl::account_id)
            .distinct();
        let ids: Vec<i64> = query.load(&mut self.con).await?;
        Ok(ids.into_iter().collect())
    }

    async fn staged_hero_count(&mut self) -> crate::Result<i64> {
        let query = crate::schema::stg_heroes::dsl::stg_heroes.count();
        Ok(query.get_result(&mut self.con).await?)
    }

    async fn insert_matches(&mut self, rows: Vec<StagedMatch>) -> crate::Result<usize> {
        let written = self
            .con
            .build_transaction()
            .run(move |con| {
                Box::pin(async move {
                    let query = diesel::dsl::insert_into(crate::schema::stg_matches::dsl::stg_matches)
                        .values(&rows);
                    tracing::trace!(?query, "Insert staged matches");

                    query.execute(con).await
                })
            })
            .await?;

        Ok(written)
    }

    async fn insert_teams(&mut self, rows: Vec<StagedTeam>) -> crate::Result<usize> {
        let written = self
            .con
            .build_transaction()
            .run(move |con| {
                Box::pin(async move {
                    diesel::dsl::insert_into(crate::schema::stg_teams::dsl::stg_teams)
                        .values(&rows)
                        .execute(con)
                        .await
                })
            })
            .await?;

        Ok(written)
    }

    async fn insert_players(&mut self, rows: Vec<StagedPlayer>) -> crate::Result<usize> {
        let written = self
            .con
            .build_transaction()
            .run(move |con| {
                Box::pin(async move {
                    diesel::dsl::insert_into(crate::schema::stg_players::dsl::stg_players)
                        .values(&rows)
                        .execute(con)
                        .await
                })
            })
            .await?;

        Ok(written)
    }

    async fn replace_heroes(&mut self, rows: Vec<StagedHero>) -> crate::Result<usize> {
        let written = self
            .con
            .build_transaction()
            .run(move |con| {
                Box::pin(async move {
                    let removed = diesel::dsl::delete(crate::schema::stg_heroes::dsl::stg_heroes)
                        .execute(con)
                        .await?;
                    tracing::debug!("Removed {} staged heroes", removed);

                    diesel::dsl::insert_into(crate::schema::stg_heroes::dsl::stg_heroes)
                        .values(&rows)
                        .execute(con)
                        .await
                })
            })
            .await?;

        Ok(written)
    }
}

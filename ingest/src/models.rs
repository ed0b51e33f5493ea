use diesel::prelude::*;

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stg_matches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StagedMatch {
    pub match_id: i64,
    pub raw_json: serde_json::Value,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stg_teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StagedTeam {
    pub team_id: i64,
    pub raw_json: serde_json::Value,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stg_players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StagedPlayer {
    pub account_id: i64,
    pub raw_json: serde_json::Value,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stg_heroes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StagedHero {
    pub hero_id: i64,
    pub raw_json: serde_json::Value,
}

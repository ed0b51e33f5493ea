// Tables are created by the schema setup step that runs before ingestion.

diesel::table! {
    stg_matches (match_id) {
        match_id -> Int8,
        raw_json -> Jsonb,
    }
}

diesel::table! {
    stg_teams (team_id) {
        team_id -> Int8,
        raw_json -> Jsonb,
    }
}

diesel::table! {
    stg_players (account_id) {
        account_id -> Int8,
        raw_json -> Jsonb,
    }
}

diesel::table! {
    stg_heroes (hero_id) {
        hero_id -> Int8,
        raw_json -> Jsonb,
    }
}

diesel::table! {
    fact_matches (match_id) {
        match_id -> Int8,
        start_time -> Int8,
    }
}

diesel::table! {
    dim_teams (team_id) {
        team_id -> Int8,
    }
}

diesel::table! {
    dim_players (account_id) {
        account_id -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    stg_matches,
    stg_teams,
    stg_players,
    stg_heroes,
    fact_matches,
    dim_teams,
    dim_players,
);

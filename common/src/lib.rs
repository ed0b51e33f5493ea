pub mod opendota;

/// Account id OpenDota reports for players that hide their profile.
pub const ANONYMOUS_ACCOUNT_ID: i64 = 4294967295;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Initial,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOrder {
    OldestFirst,
    #[default]
    NewestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: LoadMode,
    pub candidates: usize,
    pub new_matches: usize,
    pub matches_stored: usize,
    pub players_stored: usize,
    pub teams_stored: usize,
    pub heroes_stored: usize,
    pub api_calls: u64,
}

impl RunReport {
    pub fn empty(mode: LoadMode) -> Self {
        Self {
            mode,
            candidates: 0,
            new_matches: 0,
            matches_stored: 0,
            players_stored: 0,
            teams_stored: 0,
            heroes_stored: 0,
            api_calls: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.matches_stored + self.players_stored + self.teams_stored + self.heroes_stored
    }
}

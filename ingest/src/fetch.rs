use common::opendota::{Hero, MatchDetails, MatchSummary, PlayerProfile, Team};

/// Where the pipeline gets its upstream data from.
///
/// Implementations never fail, unavailable data is reported as absent.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    /// Up to `depth` of the most recent matches played by `team_id`.
    async fn team_matches(&self, team_id: i64, depth: usize) -> Vec<MatchSummary>;

    async fn match_details(&self, match_id: i64) -> Option<MatchDetails>;

    async fn team_info(&self, team_id: i64) -> Option<Team>;

    async fn player_info(&self, account_id: i64) -> Option<PlayerProfile>;

    async fn heroes(&self) -> Vec<Hero>;

    /// Successful upstream calls made through this source.
    fn api_calls(&self) -> u64;
}

pub struct OpenDota {
    client: crate::api::Client,
    base_url: String,
}

impl OpenDota {
    pub fn new<IS>(client: crate::api::Client, base_url: IS) -> Self
    where
        IS: Into<String>,
    {
        let base_url: String = base_url.into();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl Source for OpenDota {
    #[tracing::instrument(skip(self))]
    async fn team_matches(&self, team_id: i64, depth: usize) -> Vec<MatchSummary> {
        let url = self.url(&format!("teams/{}/matches", team_id));

        let mut matches: Vec<MatchSummary> = match self.client.get(&url).await {
            Some(m) => m,
            None => {
                tracing::warn!("API returned no matches, using an empty list");
                return Vec::new();
            }
        };

        matches.truncate(depth);
        tracing::info!("API returned {} matches (depth {})", matches.len(), depth);

        matches
    }

    #[tracing::instrument(skip(self))]
    async fn match_details(&self, match_id: i64) -> Option<MatchDetails> {
        let url = self.url(&format!("matches/{}", match_id));
        self.client.get(&url).await
    }

    #[tracing::instrument(skip(self))]
    async fn team_info(&self, team_id: i64) -> Option<Team> {
        let url = self.url(&format!("teams/{}", team_id));
        self.client.get(&url).await
    }

    #[tracing::instrument(skip(self))]
    async fn player_info(&self, account_id: i64) -> Option<PlayerProfile> {
        if account_id == 0 || account_id == common::ANONYMOUS_ACCOUNT_ID {
            return None;
        }

        let url = self.url(&format!("players/{}", account_id));
        self.client.get(&url).await
    }

    #[tracing::instrument(skip(self))]
    async fn heroes(&self) -> Vec<Hero> {
        let url = self.url("heroes");
        self.client.get(&url).await.unwrap_or_default()
    }

    fn api_calls(&self) -> u64 {
        self.client.api_calls()
    }
}

use std::time::Duration;

use crate::api::RetryPolicy;
use crate::pacer::{Interval, Pacer};
use crate::pipeline::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LoadOrderArg {
    OldestFirst,
    NewestFirst,
}

impl From<LoadOrderArg> for common::LoadOrder {
    fn from(value: LoadOrderArg) -> Self {
        match value {
            LoadOrderArg::OldestFirst => Self::OldestFirst,
            LoadOrderArg::NewestFirst => Self::NewestFirst,
        }
    }
}

/// Fetches new OpenDota matches of a team and stages them in PostgreSQL.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "ingest", version)]
pub struct Config {
    /// Path of an optional .env file loaded before parsing.
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    pub dotenv: String,

    #[arg(long, env = "OPENDOTA_API_BASE_URL", default_value = "https://api.opendota.com/api")]
    pub api_base_url: String,

    /// Sent as bearer token for higher rate limits.
    #[arg(long, env = "OPENDOTA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Overrides the POSTGRES_* connection parameters.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "POSTGRES_HOST", default_value = "db")]
    pub postgres_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub postgres_port: u16,

    #[arg(long, env = "POSTGRES_USER", default_value = "postgres")]
    pub postgres_user: String,

    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pub postgres_password: Option<String>,

    #[arg(long, env = "POSTGRES_DB", default_value = "dota2_analytics")]
    pub postgres_db: String,

    #[arg(long, env = "TEAM_ID", default_value_t = 2163)]
    pub team_id: i64,

    /// Matches processed per run, defaults depend on the load mode.
    #[arg(long, env = "MATCH_LIMIT")]
    pub match_limit: Option<usize>,

    /// Recent team matches considered per run, defaults depend on the load mode.
    #[arg(long, env = "CANDIDATE_DEPTH")]
    pub candidate_depth: Option<usize>,

    #[arg(long, env = "LOAD_ORDER", value_enum, default_value_t = LoadOrderArg::NewestFirst)]
    pub load_order: LoadOrderArg,

    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retry_attempts: u32,

    #[arg(long, env = "BACKOFF_FACTOR", default_value_t = 2.0)]
    pub backoff_base: f64,

    #[arg(long, env = "RETRY_JITTER_MIN_SECS", default_value_t = 5.0)]
    pub retry_jitter_min: f64,

    #[arg(long, env = "RETRY_JITTER_MAX_SECS", default_value_t = 10.0)]
    pub retry_jitter_max: f64,

    /// Per request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout: u64,

    #[arg(long, env = "MATCH_DELAY_MIN_SECS", default_value_t = 3.0)]
    pub match_delay_min: f64,

    #[arg(long, env = "MATCH_DELAY_MAX_SECS", default_value_t = 7.0)]
    pub match_delay_max: f64,

    #[arg(long, env = "PLAYER_DELAY_MIN_SECS", default_value_t = 1.0)]
    pub player_delay_min: f64,

    #[arg(long, env = "PLAYER_DELAY_MAX_SECS", default_value_t = 3.0)]
    pub player_delay_max: f64,

    #[arg(long, env = "FETCH_PLAYER_PROFILES")]
    pub fetch_player_profiles: bool,

    /// Attempts to reach the database before giving up.
    #[arg(long, env = "DB_CONNECT_RETRIES", default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub db_connect_retries: u32,

    /// Seconds between database connection attempts.
    #[arg(long, env = "DB_CONNECT_DELAY_SECS", default_value_t = 2)]
    pub db_connect_delay: u64,

    /// Also write logs to this file.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

/// Longest pause or jitter a run accepts, in seconds.
const MAX_DELAY_SECS: f64 = 3600.0;

impl Config {
    pub fn validate(&self) -> crate::Result<()> {
        let intervals = [
            ("retry jitter", self.retry_jitter_min, self.retry_jitter_max),
            ("match delay", self.match_delay_min, self.match_delay_max),
            ("player delay", self.player_delay_min, self.player_delay_max),
        ];
        for (name, min, max) in intervals {
            let finite = min.is_finite() && max.is_finite();
            if !finite || min < 0.0 || max < min || max > MAX_DELAY_SECS {
                return Err(crate::Error::Config(format!(
                    "{} range {}..{} is invalid",
                    name, min, max
                )));
            }
        }

        // Below 1 the backoff would shrink with every attempt
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(crate::Error::Config(format!(
                "backoff base {} must be at least 1",
                self.backoff_base
            )));
        }

        if self.match_limit == Some(0) || self.candidate_depth == Some(0) {
            return Err(crate::Error::Config(
                "match limit and candidate depth must be positive".to_owned(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(crate::Error::Config("request timeout must be positive".to_owned()));
        }

        Ok(())
    }

    /// Connection string for the staging database.
    pub fn database_url(&self) -> String {
        if let Some(url) = self.database_url.as_ref() {
            return url.clone();
        }

        let mut parts = vec![
            format!("host={}", quote(&self.postgres_host)),
            format!("port={}", self.postgres_port),
            format!("user={}", quote(&self.postgres_user)),
            format!("dbname={}", quote(&self.postgres_db)),
        ];
        if let Some(password) = self.postgres_password.as_ref() {
            parts.push(format!("password={}", quote(password)));
        }

        parts.join(" ")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn db_connect_delay(&self) -> Duration {
        Duration::from_secs(self.db_connect_delay)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff_base: self.backoff_base,
            jitter: Interval::from_secs(self.retry_jitter_min, self.retry_jitter_max),
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(
            Interval::from_secs(self.match_delay_min, self.match_delay_max),
            Interval::from_secs(self.player_delay_min, self.player_delay_max),
        )
    }

    pub fn settings(&self) -> Settings {
        Settings {
            team_id: self.team_id,
            match_limit: self.match_limit,
            candidate_depth: self.candidate_depth,
            order: self.load_order.into(),
            fetch_player_profiles: self.fetch_player_profiles,
        }
    }
}

/// Quotes a value for a libpq style `key=value` connection string.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

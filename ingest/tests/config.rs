use std::time::Duration;

use clap::Parser;
use common::LoadOrder;
use ingest::config::Config;
use ingest::pacer::Interval;
use pretty_assertions::assert_eq;

fn parse(args: &[&str]) -> Config {
    Config::try_parse_from(std::iter::once("ingest").chain(args.iter().copied())).unwrap()
}

#[test]
fn options_map_onto_settings() {
    let config = parse(&[
        "--team-id",
        "15",
        "--match-limit",
        "5",
        "--candidate-depth",
        "40",
        "--load-order",
        "oldest-first",
        "--fetch-player-profiles",
    ]);
    config.validate().unwrap();

    let settings = config.settings();
    assert_eq!(15, settings.team_id);
    assert_eq!(Some(5), settings.match_limit);
    assert_eq!(Some(40), settings.candidate_depth);
    assert_eq!(LoadOrder::OldestFirst, settings.order);
    assert!(settings.fetch_player_profiles);
}

#[test]
fn retry_options() {
    let config = parse(&[
        "--retry-attempts",
        "5",
        "--backoff-base",
        "1.5",
        "--retry-jitter-min",
        "1",
        "--retry-jitter-max",
        "2",
        "--request-timeout",
        "10",
    ]);
    config.validate().unwrap();

    let policy = config.retry_policy();
    assert_eq!(5, policy.attempts);
    assert_eq!(1.5, policy.backoff_base);
    assert_eq!(Interval::from_secs(1.0, 2.0), policy.jitter);
    assert_eq!(Duration::from_secs(10), config.request_timeout());
}

#[test]
fn zero_retry_attempts_are_rejected() {
    let result = Config::try_parse_from(["ingest", "--retry-attempts", "0"]);
    assert!(result.is_err());
}

#[test]
fn inverted_intervals_are_rejected() {
    let config = parse(&["--match-delay-min", "7", "--match-delay-max", "3"]);

    assert!(matches!(config.validate(), Err(ingest::Error::Config(_))));
}

#[test]
fn zero_limit_is_rejected() {
    let config = parse(&["--match-limit", "0"]);

    assert!(matches!(config.validate(), Err(ingest::Error::Config(_))));
}

#[test]
fn negative_backoff_is_rejected() {
    let config = parse(&["--backoff-base=-2"]);

    assert!(matches!(config.validate(), Err(ingest::Error::Config(_))));
}

#[test]
fn shrinking_backoff_is_rejected() {
    let config = parse(&["--backoff-base", "0.5"]);

    assert!(matches!(config.validate(), Err(ingest::Error::Config(_))));
    assert!(parse(&["--backoff-base", "1"]).validate().is_ok());
}

#[test]
fn oversized_delays_are_rejected() {
    for args in [
        ["--match-delay-max", "1e30"],
        ["--player-delay-max", "1e9"],
        ["--retry-jitter-max", "7200"],
    ] {
        let config = parse(&args);
        assert!(
            matches!(config.validate(), Err(ingest::Error::Config(_))),
            "{:?}",
            args
        );
    }
}

#[test]
fn database_url_takes_precedence() {
    let config = parse(&["--database-url", "postgres://etl@localhost/dota"]);

    assert_eq!("postgres://etl@localhost/dota", config.database_url());
}

#[test]
fn database_url_from_parts() {
    if std::env::var_os("DATABASE_URL").is_some() {
        return;
    }

    let config = parse(&[
        "--postgres-host",
        "db",
        "--postgres-port",
        "5433",
        "--postgres-user",
        "postgres",
        "--postgres-password",
        "it's",
        "--postgres-db",
        "dota2_analytics",
    ]);

    assert_eq!(
        "host='db' port=5433 user='postgres' dbname='dota2_analytics' password='it\\'s'",
        config.database_url()
    );
}

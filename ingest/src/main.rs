use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;

use ingest::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let mut config = Config::parse();
    if std::path::Path::new(&config.dotenv).exists() {
        if let Err(e) = dotenvy::from_path(&config.dotenv) {
            eprintln!("Loading {}: {}", config.dotenv, e);
            return std::process::ExitCode::FAILURE;
        }
        config = Config::parse();
    }

    let _log_guard = init_tracing(config.log_file.as_deref());

    tracing::info!("Starting...");

    match run(config).await {
        Ok(report) => {
            tracing::info!(
                mode = ?report.mode,
                rows = report.rows_written(),
                "Total API Calls Made: {}",
                report.api_calls
            );
            tracing::info!("Data fetching complete!");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Ingestion failed: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> ingest::Result<common::RunReport> {
    config.validate()?;

    let client = ingest::api::Client::new(
        config.api_key.clone(),
        config.request_timeout(),
        config.retry_policy(),
    )
    .map_err(|e| ingest::Error::Config(format!("Building HTTP client: {}", e)))?;
    let source = ingest::fetch::OpenDota::new(client, config.api_base_url.clone());

    tracing::info!("Waiting for the database");
    let con = ingest::db_connection(
        &config.database_url(),
        config.db_connect_retries,
        config.db_connect_delay(),
    )
    .await?;
    let mut storage = ingest::storage::PgStorage::new(con);

    let pipeline = ingest::pipeline::Pipeline::new(config.settings(), config.pacer());
    pipeline.run(&source, &mut storage).await
}

fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ingest=info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("ingest.log"));

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer);
    if let Err(e) = tracing::subscriber::set_global_default(registry) {
        eprintln!("Installing tracing subscriber: {}", e);
    }

    guard
}

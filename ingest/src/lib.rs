pub mod api;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod models;
pub mod pacer;
pub mod pipeline;
pub mod schema;
pub mod storage;
pub mod watermark;

mod error;
pub use error::{Error, Result};

/// Connects to the staging database, waiting for it to come up.
#[tracing::instrument(skip(database_url))]
pub async fn db_connection(
    database_url: &str,
    attempts: u32,
    delay: std::time::Duration,
) -> Result<diesel_async::AsyncPgConnection> {
    use diesel_async::AsyncConnection;

    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match diesel_async::AsyncPgConnection::establish(database_url).await {
            Ok(con) => {
                tracing::info!("Database is ready");
                return Ok(con);
            }
            Err(e) if attempt < attempts => {
                tracing::info!(
                    "Database not ready, waiting {:?} (attempt {}/{}): {}",
                    delay,
                    attempt,
                    attempts,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("Database did not become ready after {} attempts", attempts);
                return Err(Error::Connection(e));
            }
        }
    }
}

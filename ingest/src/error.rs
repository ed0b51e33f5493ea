pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connecting to database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Serializing payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

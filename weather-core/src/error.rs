use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;

/// Everything that can stop a run, from config loading to the insert.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not determine platform config directory")]
    ConfigDir,

    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid database settings: {0}")]
    InvalidDatabaseConfig(String),

    #[error("Failed to send request to weatherstack: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weatherstack request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("weatherstack returned error {code} ({kind}): {info}")]
    Provider { code: i64, kind: String, info: String },

    #[error("Malformed weatherstack payload: {0}")]
    MalformedPayload(String),

    #[error("Unsupported database url scheme '{0}' (expected postgres:// or sqlite:)")]
    UnsupportedDatabase(String),

    #[error("Timed out connecting to database after {0:?}")]
    DatabaseTimeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

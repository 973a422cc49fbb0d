//! Client error types.

use std::path::PathBuf;

use thiserror::Error;
use tripwatch_core::{CredentialsError, TracingError, UnknownTimeZone};
use tripwatch_providers::ProviderError;
use tripwatch_server::{RefreshError, ServerError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    TimeZone(#[from] UnknownTimeZone),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tracing(#[from] TracingError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no booking with reference {0}")]
    UnknownBooking(String),

    /// The command ran but has nothing to show, e.g. a booking without images.
    #[error("{0}")]
    NothingToShow(String),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {err}"))
    }
}

//! Server error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tripwatch_core::{CredentialsError, DecodeError};
use tripwatch_providers::{ProviderError, ProviderErrorCode};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Why a poll did not produce a new snapshot.
///
/// This is everything an adapter or caller ever learns about a failed
/// fetch; transport details are folded into the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Upstream rejected the credentials. Polling stops until they change.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Upstream asked us to slow down. The next scheduled tick retries.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The body was not a JSON object matching the booking schema.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl RefreshError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Authentication(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::RateLimited(_) => "rate_limited",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<ProviderError> for RefreshError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err.code() {
            ProviderErrorCode::AuthenticationFailed => Self::Authentication(message),
            ProviderErrorCode::RateLimited => Self::RateLimited(message),
            ProviderErrorCode::InvalidResponse => Self::MalformedResponse(message),
            _ => Self::Unknown(message),
        }
    }
}

impl From<DecodeError> for RefreshError {
    fn from(err: DecodeError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid booking file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no booking with reference {0}")]
    UnknownBooking(String),

    #[error("booking {0} has expired")]
    Expired(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }
}

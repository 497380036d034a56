//! Client error types.

use calend_core::{BatchError, ConflictError, ResolveError};
use calend_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials or tokens are missing.
    #[error("Credentials not initialised, please run init.")]
    NotInitialised,

    /// Mutually exclusive `add` flags were combined.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// A date or time could not be resolved.
    #[error("invalid date: {0}")]
    Resolve(#[from] ResolveError),

    /// The batch file could not be read or parsed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// The calendar service failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Requests could not be encoded for `--dry-run`.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns true for outcomes that are reported to the user but do not
    /// make the process fail.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NotInitialised | Self::Conflict(_))
    }
}

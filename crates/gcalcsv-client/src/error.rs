//! Client error types.

use gcalcsv_core::WindowError;
use gcalcsv_providers::{ProviderError, ProviderErrorCode};
use thiserror::Error;

use crate::signal::CancelReason;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end an export run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad flags, unreadable files or an unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested date range cannot be resolved.
    #[error("invalid date range: {0}")]
    Window(#[from] WindowError),

    /// No usable credential could be obtained.
    #[error("authentication failed: {0}")]
    Auth(#[source] ProviderError),

    /// The calendar API failed while listing events.
    #[error("unable to retrieve events: {0}")]
    Transport(#[source] ProviderError),

    /// The traversal was stopped before completion.
    #[error("{0}")]
    Cancelled(CancelReason),

    /// A row could not be written to the output.
    #[error("unable to write record: {0}")]
    Write(#[from] csv::Error),
}

impl ClientError {
    /// Classifies a failure from credential acquisition.
    ///
    /// Unreadable secrets and credential files that cannot be persisted are
    /// configuration problems; everything else is an authentication failure.
    pub fn from_auth(err: ProviderError) -> Self {
        match err.code() {
            ProviderErrorCode::Configuration => Self::Config(err.to_string()),
            _ => Self::Auth(err),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Window(_) => 2,
            Self::Auth(_) => 3,
            Self::Transport(_) => 4,
            Self::Cancelled(_) => 5,
            Self::Write(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let errors = [
            ClientError::Config("bad".into()),
            ClientError::Window(WindowError::OutOfRange { flag: "start" }),
            ClientError::Auth(ProviderError::authentication("denied")),
            ClientError::Transport(ProviderError::network("reset")),
            ClientError::Cancelled(CancelReason::DeadlineExceeded),
            ClientError::Write(csv::Error::from(std::io::Error::other("closed"))),
        ];
        let codes: Vec<u8> = errors.iter().map(ClientError::exit_code).collect();
        assert_eq!(codes, vec![2, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn persistence_failure_is_configuration_error() {
        let err = ClientError::from_auth(ProviderError::configuration("read-only directory"));
        assert!(matches!(err, ClientError::Config(_)));
        assert_eq!(err.exit_code(), 2);

        let err = ClientError::from_auth(ProviderError::authentication("invalid_grant"));
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[test]
    fn cancellation_is_not_a_transport_error() {
        let err = ClientError::Cancelled(CancelReason::Interrupted);
        assert_eq!(err.to_string(), "interrupted");
        assert_ne!(err.exit_code(), 4);
    }
}

//! Error types for calendar provider operations.
//!
//! Every failure raised while talking to the identity provider, the calendar
//! API or the local credential cache is a [`ProviderError`]. The caller decides
//! which stage a failure belongs to; the code only says what went wrong.

use std::fmt;

use thiserror::Error;

/// What kind of failure a [`ProviderError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The token endpoint or the API rejected the credential or code.
    Unauthenticated,
    /// The credential is valid but may not read the calendar (HTTP 403).
    Forbidden,
    /// No HTTP response: connection, DNS or timeout failure.
    Network,
    /// HTTP 429 from the calendar API.
    RateLimited,
    /// Any other non-success HTTP status.
    Server,
    /// A response body that does not decode.
    MalformedResponse,
    /// There is no cached credential file yet.
    MissingCredential,
    /// Local files or settings are unreadable, invalid or unwritable.
    Configuration,
    /// Local failure that should not happen.
    Internal,
}

impl ProviderErrorCode {
    /// Stable snake_case name, used as the message prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::MalformedResponse => "malformed_response",
            Self::MissingCredential => "missing_credential",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// A failed provider operation: a code, a message and an optional cause.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unauthenticated, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Forbidden, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Server, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::MalformedResponse, message)
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::MissingCredential, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// The message without the code prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the credential cache simply does not exist yet.
    pub fn is_missing_credential(&self) -> bool {
        self.code == ProviderErrorCode::MissingCredential
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

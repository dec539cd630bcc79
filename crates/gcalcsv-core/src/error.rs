//! Errors raised while building a query window from user input.

use thiserror::Error;

/// An invalid date, duration or window supplied by the user.
///
/// All of these are raised before any network traffic happens.
#[derive(Debug, Error)]
pub enum WindowError {
    /// A `--start`/`--end` value is not an RFC3339 timestamp.
    #[error("unable to parse {flag} date {value:?}: {source}")]
    InvalidTimestamp {
        /// Which bound was being parsed ("start" or "end").
        flag: &'static str,
        /// The raw value as given.
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A `--from`/`--to` value is not a valid duration.
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Applying an offset pushed a bound outside the representable range.
    #[error("{flag} date is out of range after applying offset")]
    OutOfRange { flag: &'static str },

    /// The resolved end is not strictly after the resolved start.
    #[error("end date must be after start date: {start} -> {end}")]
    EmptyWindow { start: String, end: String },
}

impl WindowError {
    pub(crate) fn invalid_duration(value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

//! Query window resolution.
//!
//! A [`QueryWindow`] is the half-open `[start, end)` interval events are
//! fetched for. It can only be built through [`QueryWindow::new`] or
//! [`resolve_window`], both of which reject empty or inverted windows.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::WindowError;

/// Formats a timestamp the way the calendar API expects it (`2024-01-02T10:00:00Z`).
pub fn format_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A half-open time interval in UTC with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl QueryWindow {
    /// Creates a window, failing if `end` is not strictly after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if end <= start {
            return Err(WindowError::EmptyWindow {
                start: format_rfc3339(start),
                end: format_rfc3339(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Start of the window (inclusive).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the window (exclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Lower bound in wire format (inclusive).
    pub fn time_min(&self) -> String {
        format_rfc3339(self.start)
    }

    /// Upper bound in wire format (exclusive).
    pub fn time_max(&self) -> String {
        format_rfc3339(self.end)
    }
}

/// Raw user input for a window: optional bounds plus offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInputs {
    /// RFC3339 start; `None` means "now".
    pub start: Option<String>,
    /// RFC3339 end; `None` means "now".
    pub end: Option<String>,
    /// Subtracted from the start.
    pub from: Duration,
    /// Added to the end.
    pub to: Duration,
}

impl WindowInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_from(mut self, from: Duration) -> Self {
        self.from = from;
        self
    }

    pub fn with_to(mut self, to: Duration) -> Self {
        self.to = to;
        self
    }
}

/// Resolves user input into a validated window.
///
/// `start = (start or now) - from` and `end = (end or now) + to`. Offsets are
/// signed, so a negative `from` moves the start forward.
///
/// # Errors
///
/// Fails on unparsable timestamps, on offsets that overflow, and when the
/// resolved end is not after the resolved start.
pub fn resolve_window(
    inputs: &WindowInputs,
    now: DateTime<Utc>,
) -> Result<QueryWindow, WindowError> {
    let start = parse_bound("start", inputs.start.as_deref(), now)?
        .checked_sub_signed(inputs.from)
        .ok_or(WindowError::OutOfRange { flag: "start" })?;
    let end = parse_bound("end", inputs.end.as_deref(), now)?
        .checked_add_signed(inputs.to)
        .ok_or(WindowError::OutOfRange { flag: "end" })?;
    QueryWindow::new(start, end)
}

fn parse_bound(
    flag: &'static str,
    value: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, WindowError> {
    // An empty flag value means the flag was not given.
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(now),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|source| WindowError::InvalidTimestamp {
                flag,
                value: raw.to_string(),
                source,
            }),
    }
}

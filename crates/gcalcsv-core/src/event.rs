//! Calendar event records as consumed by the exporter.
//!
//! Start values are kept verbatim as the calendar service sent them so the
//! output reproduces them exactly; nothing here reformats timestamps.

use serde::{Deserialize, Serialize};

/// The start of an event: either a precise timestamp or an all-day date.
///
/// The service fills exactly one of the two in practice, but both are
/// optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStart {
    /// RFC3339 timestamp for timed events.
    pub date_time: Option<String>,
    /// `YYYY-MM-DD` date for all-day events.
    pub date: Option<String>,
    /// IANA timezone the event was created in, if reported.
    pub time_zone: Option<String>,
}

impl EventStart {
    /// A timed start.
    pub fn timed(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Self::default()
        }
    }

    /// An all-day start.
    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Self::default()
        }
    }

    /// Returns the precise timestamp if non-empty, else the date, else `""`.
    pub fn display(&self) -> &str {
        match self.date_time.as_deref().filter(|dt| !dt.is_empty()) {
            Some(dt) => dt,
            None => self.date.as_deref().unwrap_or_default(),
        }
    }

    /// Returns `true` when only the date-only field is usable.
    pub fn is_all_day(&self) -> bool {
        self.date_time.as_deref().is_none_or(str::is_empty)
    }
}

/// A single calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Provider-assigned identifier.
    pub id: Option<String>,
    /// Display title; empty when the event has none.
    pub summary: String,
    pub start: EventStart,
}

impl EventRecord {
    pub fn new(summary: impl Into<String>, start: EventStart) -> Self {
        Self {
            id: None,
            summary: summary.into(),
            start,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_precise_timestamp() {
        let start = EventStart {
            date_time: Some("2024-01-02T10:00:00Z".to_string()),
            date: Some("2024-01-02".to_string()),
            time_zone: None,
        };
        assert_eq!(start.display(), "2024-01-02T10:00:00Z");
        assert!(!start.is_all_day());
    }

    #[test]
    fn display_falls_back_to_date() {
        let start = EventStart {
            date_time: Some(String::new()),
            date: Some("2024-01-03".to_string()),
            time_zone: None,
        };
        assert_eq!(start.display(), "2024-01-03");
        assert!(start.is_all_day());
        assert_eq!(EventStart::all_day("2024-01-03").display(), "2024-01-03");
    }

    #[test]
    fn display_of_missing_start_is_empty() {
        assert_eq!(EventStart::default().display(), "");
    }

    #[test]
    fn record_serializes_with_start() {
        let record = EventRecord::new("Standup", EventStart::timed("2024-01-02T10:00:00Z"))
            .with_id("abc123");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "abc123");
        assert_eq!(json["summary"], "Standup");
        assert_eq!(json["start"]["date_time"], "2024-01-02T10:00:00Z");
    }
}

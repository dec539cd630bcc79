//! Calendar v3 `events.list` paging.
//!
//! [`GoogleCalendarClient`] fetches single pages; [`GoogleEventPages`] walks
//! them as a [`PageSource`], following `nextPageToken` until it runs out.

use std::time::Duration;

use gcalcsv_core::{EventRecord, EventStart, QueryWindow};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::page::{BoxFuture, EventPage, PageSource};

/// Root of the Calendar v3 REST API.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Parameters of one `events.list` traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// The calendar identifier (e.g., "primary").
    pub calendar_id: String,
    /// Events starting in this window are listed.
    pub window: QueryWindow,
    /// Events per round trip.
    pub page_size: u32,
}

impl EventQuery {
    /// Events requested per page.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    pub fn new(calendar_id: impl Into<String>, window: QueryWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    /// Query string for one page request.
    ///
    /// Deleted entries are excluded, recurring events are expanded into
    /// single instances and results come back ordered by start time.
    pub fn params(&self, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("showDeleted", "false".to_string()),
            ("singleEvents", "true".to_string()),
            ("timeMin", self.window.time_min()),
            ("timeMax", self.window.time_max()),
            ("maxResults", self.page_size.to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        params
    }
}

/// Authorized HTTP access to one account's calendars.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Builds a client sending `access_token` as bearer credential.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gcalcsv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns a lazy page source for `query`.
    pub fn event_pages(&self, query: EventQuery) -> GoogleEventPages<'_> {
        GoogleEventPages {
            client: self,
            query,
            next_page_token: None,
            exhausted: false,
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(calendar_id)
        )
    }

    /// Fetches the page starting at `page_token` (the first page if `None`).
    pub async fn list_events_page(
        &self,
        query: &EventQuery,
        page_token: Option<&str>,
    ) -> ProviderResult<EventPage> {
        let url = self.events_url(&query.calendar_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query.params(page_token))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after_secs, &body));
        }

        let body = response.text().await.map_err(request_error)?;
        parse_event_page(&body)
    }
}

/// Walks the pages of one `events.list` query.
#[derive(Debug)]
pub struct GoogleEventPages<'a> {
    client: &'a GoogleCalendarClient,
    query: EventQuery,
    next_page_token: Option<String>,
    exhausted: bool,
}

impl PageSource for GoogleEventPages<'_> {
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<EventPage>>> {
        Box::pin(async move {
            if self.exhausted {
                return Ok(None);
            }

            let page = self
                .client
                .list_events_page(&self.query, self.next_page_token.as_deref())
                .await?;

            debug!(
                "fetched page of {} events from calendar {}",
                page.len(),
                self.query.calendar_id
            );

            if page.is_last() {
                self.exhausted = true;
                self.next_page_token = None;
            } else {
                self.next_page_token = page.next_page_token.clone();
            }
            Ok(Some(page))
        })
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "events.list request timed out".to_string()
    } else {
        format!("events.list request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Maps a non-success `events.list` status to a provider error.
fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::authentication(format!(
            "calendar API rejected the access token: {}",
            api_message(body)
        )),
        StatusCode::FORBIDDEN => ProviderError::authorization(format!(
            "no read access to calendar: {}",
            api_message(body)
        )),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(match retry_after_secs {
            Some(secs) => format!("quota exceeded, retry after {} seconds", secs),
            None => "quota exceeded".to_string(),
        }),
        _ => ProviderError::server(format!(
            "calendar API returned {}: {}",
            status,
            api_message(body)
        )),
    }
}

/// Google wraps API failures as `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Decodes an `events.list` response body.
fn parse_event_page(body: &str) -> ProviderResult<EventPage> {
    let response: EventsListBody = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
    })?;

    Ok(EventPage {
        items: response.items.into_iter().map(WireEvent::into_record).collect(),
        next_page_token: response.next_page_token,
    })
}

/// Body of a successful `events.list` call; unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsListBody {
    #[serde(default)]
    items: Vec<WireEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    start: WireEventStart,
}

impl WireEvent {
    fn into_record(self) -> EventRecord {
        EventRecord {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            start: EventStart {
                date_time: self.start.date_time,
                date: self.start.date,
                time_zone: self.start.time_zone,
            },
        }
    }
}

/// `start` of an event: `dateTime` for timed events, `date` for all-day ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEventStart {
    date: Option<String>,
    date_time: Option<String>,
    time_zone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};

    fn window() -> QueryWindow {
        QueryWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn query_params_for_first_page() {
        let query = EventQuery::new("primary", window());
        let params = query.params(None);

        assert_eq!(param(&params, "showDeleted"), Some("false"));
        assert_eq!(param(&params, "singleEvents"), Some("true"));
        assert_eq!(param(&params, "timeMin"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(param(&params, "timeMax"), Some("2024-01-08T00:00:00Z"));
        assert_eq!(param(&params, "maxResults"), Some("10"));
        assert_eq!(param(&params, "orderBy"), Some("startTime"));
        assert_eq!(param(&params, "pageToken"), None);
    }

    #[test]
    fn query_params_carry_page_token() {
        let query = EventQuery::new("primary", window());
        let params = query.params(Some("CiAKGjBp"));
        assert_eq!(param(&params, "pageToken"), Some("CiAKGjBp"));
    }

    #[test]
    fn events_url_encodes_calendar_id() {
        let client = GoogleCalendarClient::new("token", Duration::from_secs(5))
            .unwrap()
            .with_base_url("https://calendar.test/v3/");
        assert_eq!(
            client.events_url("team@group.calendar.google.com"),
            "https://calendar.test/v3/calendars/team%40group.calendar.google.com/events"
        );
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "kind": "calendar#events",
            "nextPageToken": "next-1",
            "items": [
                {
                    "id": "event1",
                    "summary": "Standup",
                    "start": { "dateTime": "2024-01-02T10:00:00Z", "timeZone": "Europe/Paris" },
                    "end": { "dateTime": "2024-01-02T10:15:00Z" },
                    "status": "confirmed"
                },
                {
                    "id": "event2",
                    "summary": "Holiday",
                    "start": { "date": "2024-01-03" },
                    "end": { "date": "2024-01-04" }
                }
            ]
        }"#;

        let page = parse_event_page(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("next-1"));
        assert_eq!(page.len(), 2);
        assert_eq!(page.items[0].summary, "Standup");
        assert_eq!(page.items[0].start.display(), "2024-01-02T10:00:00Z");
        assert_eq!(page.items[0].start.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(page.items[1].start.display(), "2024-01-03");
        assert_eq!(page.items[1].id.as_deref(), Some("event2"));
    }

    #[test]
    fn parse_event_without_summary_or_start() {
        let page = parse_event_page(r#"{"items": [{"id": "x"}]}"#).unwrap();
        assert_eq!(page.items[0].summary, "");
        assert_eq!(page.items[0].start.display(), "");
        assert!(page.is_last());
    }

    #[test]
    fn parse_empty_response() {
        let page = parse_event_page(r#"{"kind": "calendar#events"}"#).unwrap();
        assert!(page.is_empty());
        assert!(page.is_last());
    }

    #[test]
    fn status_mapping() {
        let forbidden = r#"{"error": {"code": 403, "message": "Calendar usage limits exceeded."}}"#;
        let err = status_error(StatusCode::FORBIDDEN, None, forbidden);
        assert_eq!(err.code(), ProviderErrorCode::Forbidden);
        assert!(err.message().ends_with("Calendar usage limits exceeded."));

        let err = status_error(StatusCode::UNAUTHORIZED, None, "");
        assert_eq!(err.code(), ProviderErrorCode::Unauthenticated);

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, Some(30), "");
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert_eq!(err.message(), "quota exceeded, retry after 30 seconds");

        let err = status_error(StatusCode::BAD_GATEWAY, None, "upstream down\n");
        assert_eq!(err.code(), ProviderErrorCode::Server);
        assert_eq!(
            err.message(),
            "calendar API returned 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn parse_invalid_response() {
        let err = parse_event_page("<html>").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::MalformedResponse);
    }
}

//! Paged result sources.
//!
//! A [`PageSource`] yields the result pages of one list query lazily, one
//! round trip per call. The sequence is finite and cannot be restarted; a
//! consumer that wants to stop early simply stops calling
//! [`PageSource::next_page`].

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use gcalcsv_core::EventRecord;

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps [`PageSource`] object-safe so callers can hold a
/// `&mut dyn PageSource`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One batch of events plus the continuation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Events in service order.
    pub items: Vec<EventRecord>,
    /// Token for the following page, `None` on the last page.
    pub next_page_token: Option<String>,
}

impl EventPage {
    /// Creates a page with the given events and no continuation.
    pub fn new(items: Vec<EventRecord>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// Builder method to set the continuation token.
    pub fn with_next_page_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }

    /// Returns true if there is no page after this one.
    pub fn is_last(&self) -> bool {
        self.next_page_token.as_deref().is_none_or(str::is_empty)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A lazy, finite, non-restartable sequence of result pages.
pub trait PageSource: Send {
    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the sequence is exhausted; calling again after
    /// that keeps returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network, authentication or decoding
    /// failures. The sequence should not be polled again after an error.
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<EventPage>>>;
}

/// A page source over pages that are already in memory.
///
/// Useful for replaying captured responses.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: VecDeque<EventPage>,
}

impl StaticPages {
    pub fn new(pages: impl IntoIterator<Item = EventPage>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }

    /// Number of pages not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pages.len()
    }
}

impl PageSource for StaticPages {
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<EventPage>>> {
        let page = self.pages.pop_front();
        Box::pin(async move { Ok(page) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcalcsv_core::EventStart;

    fn record(summary: &str) -> EventRecord {
        EventRecord::new(summary, EventStart::timed("2024-01-02T10:00:00Z"))
    }

    #[test]
    fn page_continuation() {
        let page = EventPage::new(vec![record("a")]);
        assert!(page.is_last());
        assert_eq!(page.len(), 1);

        let page = page.with_next_page_token("token-2");
        assert!(!page.is_last());

        let page = EventPage::new(vec![]).with_next_page_token("");
        assert!(page.is_last());
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn static_pages_drain_in_order() {
        let mut source = StaticPages::new([
            EventPage::new(vec![record("first")]),
            EventPage::new(vec![record("second"), record("third")]),
        ]);

        let first = source.next_page().await.unwrap().unwrap();
        assert_eq!(first.items[0].summary, "first");
        assert_eq!(source.remaining(), 1);

        let second = source.next_page().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);

        assert!(source.next_page().await.unwrap().is_none());
        assert!(source.next_page().await.unwrap().is_none());
    }
}

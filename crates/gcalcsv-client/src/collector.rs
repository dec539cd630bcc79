//! Page collection: drives a [`PageSource`] into a [`RecordWriter`].

use std::io::Write;

use gcalcsv_providers::PageSource;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::signal::CancelSignal;
use crate::writer::RecordWriter;

/// Pages and items seen during one traversal.
///
/// `items` counts every item of every processed page, including items past
/// the row limit that were not written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounters {
    pub pages: usize,
    pub items: usize,
}

/// Streams pages of events into CSV rows.
#[derive(Debug)]
pub struct PageCollector<W: Write> {
    writer: RecordWriter<W>,
    limit: Option<usize>,
    counters: CollectionCounters,
}

impl<W: Write> PageCollector<W> {
    pub fn new(writer: RecordWriter<W>) -> Self {
        Self {
            writer,
            limit: None,
            counters: CollectionCounters::default(),
        }
    }

    /// Caps the number of rows written; `None` writes everything.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Counters accumulated so far.
    pub fn counters(&self) -> CollectionCounters {
        self.counters
    }

    /// Returns the record writer.
    pub fn writer(&self) -> &RecordWriter<W> {
        &self.writer
    }

    fn limit_reached(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.writer.rows_written() >= limit)
    }

    /// Consumes `source` until it is exhausted, the row limit is reached or
    /// `signal` fires.
    ///
    /// Each page fetch races against `signal`, and the signal is checked again
    /// before a fetched page is processed, so a page that arrives after
    /// cancellation produces no rows.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Cancelled`] when the deadline elapses or an interrupt
    ///   is requested
    /// - [`ClientError::Transport`] when the source fails
    /// - [`ClientError::Write`] when a row cannot be written
    ///
    /// Rows written before the error stay in the output.
    pub async fn run<S>(
        &mut self,
        source: &mut S,
        signal: &mut CancelSignal,
    ) -> ClientResult<CollectionCounters>
    where
        S: PageSource + ?Sized,
    {
        loop {
            if self.limit_reached() {
                debug!("row limit reached after {} rows", self.writer.rows_written());
                break;
            }

            let next = tokio::select! {
                biased;
                reason = signal.triggered() => return Err(ClientError::Cancelled(reason)),
                page = source.next_page() => page.map_err(ClientError::Transport)?,
            };
            let Some(page) = next else {
                debug!("no more pages");
                break;
            };

            signal.check().map_err(ClientError::Cancelled)?;

            self.counters.pages += 1;
            self.counters.items += page.len();
            debug!(
                "processing page {} with {} items",
                self.counters.pages,
                page.len()
            );

            for event in &page.items {
                if self.limit_reached() {
                    break;
                }
                self.writer.write_record(event)?;
            }
        }

        Ok(self.counters)
    }
}

//! CSV record output.

use std::io::Write;

use gcalcsv_core::EventRecord;

/// Writes one headerless two-column row per event: start, summary.
///
/// Every record is flushed as soon as it is written, so rows emitted before a
/// later failure are complete in the output.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(output: W) -> Self {
        let inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(output);
        Self {
            inner,
            rows_written: 0,
        }
    }

    /// Writes and flushes the row for `event`.
    pub fn write_record(&mut self, event: &EventRecord) -> Result<(), csv::Error> {
        self.inner
            .write_record([event.start.display(), event.summary.as_str()])?;
        self.inner.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Returns a reference to the underlying output.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

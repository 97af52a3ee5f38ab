// ABOUTME: Output sinks that receive accepted records in emission order.
// ABOUTME: JsonLinesSink writes one JSON object per line; MemorySink keeps records for callers and tests.

use std::io::Write;

use harvest_extract::Record;

use crate::error::CrawlError;

/// Receives each accepted record exactly once.
pub trait RecordSink: Send {
    fn accept(&mut self, record: &Record) -> Result<(), CrawlError>;

    /// Called once after the last record.
    fn finish(&mut self) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Newline-delimited JSON over any writer.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: &Record) -> Result<(), CrawlError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CrawlError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<Record>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: &Record) -> Result<(), CrawlError> {
        self.records.push(record.clone());
        Ok(())
    }
}

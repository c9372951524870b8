// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Streaming export of verified entries.
//!
//! Records are written one at a time as they come off the reader; nothing
//! buffers the full result set. On failure the sink is flushed and the error
//! carries the number of records already written.
//!
//! Value decoding (JSON / string / hex) happens here, after verification, and
//! never feeds back into it.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ExportError, ReadError};
use crate::types::{render_bytes, Entry};

/// `{"key": <string-or-hex>, "value": <JSON or string>}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub key: String,
    pub value: Value,
}

impl ExportRecord {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            key: render_bytes(&entry.key),
            value: decode_value(&entry.value),
        }
    }
}

/// JSON objects and arrays are embedded as structure. Anything else keeps
/// its exact text (so `"007"` does not turn into `7`); non-UTF-8 becomes
/// `0x` hex.
pub fn decode_value(bytes: &[u8]) -> Value {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        if value.is_object() || value.is_array() {
            return value;
        }
    }
    Value::String(render_bytes(bytes))
}

/// Destination for exported records.
pub trait ExportSink {
    fn write_record(&mut self, record: &ExportRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Called once after the last record of a successful export.
    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<S: ExportSink + ?Sized> ExportSink for Box<S> {
    fn write_record(&mut self, record: &ExportRecord) -> io::Result<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Incremental JSON array: `[` on the first record, `]` on finish.
pub struct JsonArraySink<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ExportSink for JsonArraySink<W> {
    fn write_record(&mut self, record: &ExportRecord) -> io::Result<()> {
        // Serialize first so a bad record never leaves a dangling separator
        let json = serde_json::to_vec(record)?;
        let sep: &[u8] = if self.written == 0 { b"[\n  " } else { b",\n  " };
        self.out.write_all(sep)?;
        self.out.write_all(&json)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.written == 0 {
            self.out.write_all(b"[]\n")?;
        } else {
            self.out.write_all(b"\n]\n")?;
        }
        self.out.flush()
    }
}

/// One JSON object per line.
pub struct NdjsonSink<W: Write> {
    out: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ExportSink for NdjsonSink<W> {
    fn write_record(&mut self, record: &ExportRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.out.write_all(&line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Ndjson,
}

impl ExportFormat {
    pub fn sink<'w, W: Write + 'w>(self, out: W) -> Box<dyn ExportSink + 'w> {
        match self {
            ExportFormat::Json => Box::new(JsonArraySink::new(out)),
            ExportFormat::Ndjson => Box::new(NdjsonSink::new(out)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: u64,
}

/// Streams `entries` into `sink`, preserving order.
///
/// Stops at the first read or sink failure; the sink is flushed so that
/// everything counted in `ExportError::exported` has reached it.
pub fn export_to<I, S>(entries: I, sink: &mut S) -> Result<ExportSummary, ExportError>
where
    I: IntoIterator<Item = Result<Entry, ReadError>>,
    S: ExportSink + ?Sized,
{
    let mut exported: u64 = 0;

    for item in entries {
        let entry = match item {
            Ok(entry) => entry,
            Err(source) => {
                flush_after_failure(sink, exported);
                return Err(ExportError::Read { exported, source });
            }
        };

        if let Err(source) = sink.write_record(&ExportRecord::from_entry(&entry)) {
            flush_after_failure(sink, exported);
            return Err(ExportError::Sink { exported, source });
        }
        exported += 1;
    }

    sink.finish()
        .map_err(|source| ExportError::Sink { exported, source })?;

    tracing::info!("Exported {} records", exported);
    Ok(ExportSummary { exported })
}

fn flush_after_failure<S: ExportSink + ?Sized>(sink: &mut S, exported: u64) {
    if let Err(e) = sink.flush() {
        tracing::warn!("Flush after failed export ({} records written) also failed: {}", exported, e);
    }
}

//! Emitted snapshot rows and the sinks that receive them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::config::SnapshotFormat;
use crate::model::{BugId, Record};

/// One emitted version of one bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub bug_id: BugId,
    /// `"{bug_id}.{modified_ts}"`.
    #[serde(rename = "_id")]
    pub snapshot_id: String,
    /// The full snapshot document.
    pub body: serde_json::Value,
}

impl SnapshotRow {
    /// Serialize a snapshot record into an output row.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be represented as JSON.
    pub fn from_record(record: &Record) -> Result<Self, serde_json::Error> {
        Ok(Self {
            bug_id: record.bug_id,
            snapshot_id: record.id.clone(),
            body: serde_json::to_value(record)?,
        })
    }
}

/// Receiver of emitted snapshot rows.
pub trait SnapshotSink {
    /// # Errors
    ///
    /// Returns an error when the row cannot be stored or written.
    fn emit(&mut self, row: SnapshotRow) -> Result<()>;

    /// Flush buffered output. Called once after the last row.
    ///
    /// # Errors
    ///
    /// Returns an error when buffered output cannot be written.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SnapshotSink for Vec<SnapshotRow> {
    fn emit(&mut self, row: SnapshotRow) -> Result<()> {
        self.push(row);
        Ok(())
    }
}

/// Writes one JSON document per snapshot.
pub struct JsonlSink<W: Write> {
    writer: W,
    format: SnapshotFormat,
    pretty: bool,
    written: usize,
}

impl<W: Write> JsonlSink<W> {
    pub const fn new(writer: W, format: SnapshotFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            written: 0,
        }
    }

    /// Documents written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, value)
        } else {
            serde_json::to_writer(&mut self.writer, value)
        };
        written.context("serialize snapshot")?;
        self.writer.write_all(b"\n").context("write snapshot")?;
        Ok(())
    }
}

impl<W: Write> SnapshotSink for JsonlSink<W> {
    fn emit(&mut self, row: SnapshotRow) -> Result<()> {
        match self.format {
            SnapshotFormat::Jsonl => self.write_value(&row)?,
            SnapshotFormat::Bodies => self.write_value(&row.body)?,
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("flush snapshot output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    fn record() -> Record {
        let mut record = Record::new(8, 100, "bob");
        record.expires_on = Some(200);
        record
            .fields
            .insert("bug_status".into(), FieldValue::Scalar("NEW".into()));
        record
    }

    #[test]
    fn row_carries_id_and_body() {
        let row = SnapshotRow::from_record(&record()).expect("row");
        assert_eq!(row.bug_id, 8);
        assert_eq!(row.snapshot_id, "8.100");
        assert_eq!(row.body["bug_status"], "NEW");
        assert_eq!(row.body["expires_on"], 200);
    }

    #[test]
    fn envelope_lines() {
        let mut sink = JsonlSink::new(Vec::new(), SnapshotFormat::Jsonl, false);
        sink.emit(SnapshotRow::from_record(&record()).expect("row"))
            .expect("emit");
        sink.finish().expect("finish");
        assert_eq!(sink.written(), 1);

        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        assert_eq!(text.lines().count(), 1);
        let line: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(line["_id"], "8.100");
        assert_eq!(line["body"]["modified_by"], "bob");
    }

    #[test]
    fn bodies_only_lines() {
        let mut sink = JsonlSink::new(Vec::new(), SnapshotFormat::Bodies, false);
        sink.emit(SnapshotRow::from_record(&record()).expect("row"))
            .expect("emit");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let line: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(line["_id"], "8.100");
        assert!(line.get("body").is_none());
    }

    #[test]
    fn vec_sink_collects() {
        let mut rows: Vec<SnapshotRow> = Vec::new();
        rows.emit(SnapshotRow::from_record(&record()).expect("row"))
            .expect("emit");
        assert_eq!(rows.len(), 1);
    }
}

//! Streaming row source over a buffered reader.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use super::Row;
use super::parser::{ParsedLine, RowParseError, parse_line};

/// Encoding of the input row stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Eight tab-separated columns per line.
    #[default]
    Tsv,
    /// One JSON object per line.
    Jsonl,
}

impl InputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsv" | "tab" => Ok(Self::Tsv),
            "jsonl" | "ndjson" | "json" => Ok(Self::Jsonl),
            other => Err(format!("unknown input format '{other}': expected tsv or jsonl")),
        }
    }
}

/// Iterator of rows read line by line.
///
/// Comment and blank lines are skipped. Each malformed line yields an
/// error carrying its 1-based line number; iteration can continue past it.
pub struct RowReader<R> {
    lines: std::io::Lines<R>,
    format: InputFormat,
    line_no: usize,
}

impl<R: BufRead> RowReader<R> {
    pub fn new(reader: R, format: InputFormat) -> Self {
        Self {
            lines: reader.lines(),
            format,
            line_no: 0,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub const fn line_no(&self) -> usize {
        self.line_no
    }

    fn decode(&self, line: &str) -> Result<Option<Row>, RowParseError> {
        match self.format {
            InputFormat::Tsv => match parse_line(line)? {
                ParsedLine::Row(row) => Ok(Some(*row)),
                ParsedLine::Comment(_) | ParsedLine::Blank => Ok(None),
            },
            InputFormat::Jsonl => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Ok(None);
                }
                serde_json::from_str(trimmed)
                    .map(Some)
                    .map_err(|e| RowParseError::InvalidJson(e.to_string()))
            }
        }
    }
}

impl<R: BufRead> Iterator for RowReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("read input line {}", self.line_no + 1)),
                    );
                }
            };
            self.line_no += 1;
            match self.decode(&line) {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => {}
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("parse input line {}", self.line_no)),
                    );
                }
            }
        }
    }
}

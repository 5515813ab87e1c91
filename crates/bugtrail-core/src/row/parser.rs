//! TSV row parser.
//!
//! Parses one line of the merged extraction dump into a [`Row`].
//!
//! - Comment lines start with `#` and are returned as [`ParsedLine::Comment`].
//! - Blank/whitespace-only lines are returned as [`ParsedLine::Blank`].
//! - Data lines are split on exactly 7 tab characters (yielding 8 fields).
//!
//! Column values may contain `\t`, `\n`, `\r` and `\\` escapes; they are
//! decoded after splitting.

use chrono::{DateTime, NaiveDateTime};

use super::{MergeOrder, Row};
use crate::model::{BugId, Timestamp};

/// Number of tab-separated columns in a data line.
pub const FIELD_COUNT: usize = 8;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Errors that can occur while parsing a TSV line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowParseError {
    /// Line has the wrong number of tab-separated fields.
    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount {
        /// Number of fields found.
        found: usize,
        /// Expected number of fields.
        expected: usize,
    },
    /// The `bug_id` column is not an unsigned integer.
    #[error("invalid bug_id: '{0}'")]
    InvalidBugId(String),
    /// The `modified_ts` column is neither milliseconds nor a date-time.
    #[error("invalid modified_ts: '{0}'")]
    InvalidTimestamp(String),
    /// The `_merge_order` column is not an unsigned integer.
    #[error("invalid _merge_order: '{0}'")]
    InvalidMergeOrder(String),
    /// A JSONL line could not be decoded.
    #[error("invalid JSON row: {0}")]
    InvalidJson(String),
}

/// The result of parsing a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A comment line (starts with `#`). The text includes the `#` prefix.
    Comment(String),
    /// A blank or whitespace-only line.
    Blank,
    /// A successfully parsed row (boxed to reduce enum size).
    Row(Box<Row>),
}

/// Parse a timestamp column.
///
/// Accepts integer milliseconds since the epoch, RFC 3339, or the
/// `YYYY-MM-DD HH:MM:SS[.fff]` form MySQL dumps use (interpreted as UTC).
///
/// # Errors
///
/// Returns [`RowParseError::InvalidTimestamp`] when no form matches.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, RowParseError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<Timestamp>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| RowParseError::InvalidTimestamp(raw.to_string()))
}

/// Parse one TSV line.
///
/// A trailing `\r` (CRLF dumps) is ignored.
///
/// # Errors
///
/// Returns a [`RowParseError`] for data lines with the wrong column count or
/// malformed `bug_id`, `modified_ts` or `_merge_order` columns.
pub fn parse_line(line: &str) -> Result<ParsedLine, RowParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }
    if line.starts_with('#') {
        return Ok(ParsedLine::Comment(line.to_string()));
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(RowParseError::FieldCount {
            found: fields.len(),
            expected: FIELD_COUNT,
        });
    }

    let bug_id: BugId = fields[0]
        .trim()
        .parse()
        .map_err(|_| RowParseError::InvalidBugId(fields[0].to_string()))?;
    let modified_ts = parse_timestamp(fields[1])?;
    let merge_order: MergeOrder = fields[7]
        .trim()
        .parse()
        .map_err(|_| RowParseError::InvalidMergeOrder(fields[7].to_string()))?;

    Ok(ParsedLine::Row(Box::new(Row {
        bug_id,
        modified_ts,
        modified_by: unescape(fields[2]),
        field_name: unescape(fields[3]),
        field_value: unescape(fields[4]),
        field_value_removed: unescape(fields[5]),
        attach_id: unescape(fields[6]).trim().to_string(),
        merge_order,
    })))
}

fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Unknown escapes pass through untouched.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

//! Input rows and their classification.
//!
//! Every row carries the same eight columns regardless of the table it was
//! extracted from:
//!
//! ```text
//! bug_id \t modified_ts \t modified_by \t field_name \t field_value \t field_value_removed \t attach_id \t _merge_order
//! ```
//!
//! The `_merge_order` code selects how the other columns are interpreted.
//! [`Row::classify`] turns the flat row into a [`RowKind`] carrying only the
//! columns its handler needs.

pub mod parser;
pub mod reader;
pub mod types;

pub use parser::{ParsedLine, RowParseError, parse_line, parse_timestamp};
pub use reader::{InputFormat, RowReader};
pub use types::{MergeOrder, SourceTag, UnknownSourceTag};

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{BugId, Timestamp};

/// One flat row of the merged extraction stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub bug_id: BugId,
    #[serde(deserialize_with = "de_timestamp")]
    pub modified_ts: Timestamp,
    #[serde(default, deserialize_with = "de_text")]
    pub modified_by: String,
    #[serde(default, deserialize_with = "de_text")]
    pub field_name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub field_value: String,
    #[serde(default, deserialize_with = "de_text")]
    pub field_value_removed: String,
    /// Empty when the row targets the bug itself.
    #[serde(default, deserialize_with = "de_text")]
    pub attach_id: String,
    /// Raw source code. Unknown codes are kept so the row can be skipped
    /// rather than rejected.
    #[serde(rename = "_merge_order")]
    pub merge_order: MergeOrder,
}

/// Identity columns shared by every row kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMeta {
    pub bug_id: BugId,
    pub modified_ts: Timestamp,
    pub modified_by: String,
}

/// A row after dispatch on its source tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// Current value of a scalar bug column.
    BugField { field: String, value: String },
    /// One current member of a multi-valued bug field.
    BugSetMember { field: String, value: String },
    /// Current value of one attachment column.
    AttachmentField {
        attach_id: String,
        field: String,
        value: String,
    },
    /// A flag currently set on the bug (`attach_id == None`) or an attachment.
    Flag {
        attach_id: Option<String>,
        value: String,
    },
    /// One historical field diff.
    Activity {
        field: String,
        new_value: String,
        old_value: String,
        attach_id: Option<String>,
    },
}

impl RowKind {
    /// The source tag this kind was classified from.
    #[must_use]
    pub const fn tag(&self) -> SourceTag {
        match self {
            Self::BugField { .. } => SourceTag::BugField,
            Self::BugSetMember { .. } => SourceTag::BugSetMember,
            Self::AttachmentField { .. } => SourceTag::AttachmentField,
            Self::Flag { .. } => SourceTag::Flag,
            Self::Activity { .. } => SourceTag::Activity,
        }
    }
}

impl Row {
    /// The row's source tag, or `None` for codes from unknown tables.
    #[must_use]
    pub const fn tag(&self) -> Option<SourceTag> {
        SourceTag::from_code(self.merge_order)
    }

    /// Split the row into identity columns and a typed payload.
    ///
    /// Returns `None` for unknown source codes.
    #[must_use]
    pub fn classify(self) -> Option<(RowMeta, RowKind)> {
        let tag = self.tag()?;
        let meta = RowMeta {
            bug_id: self.bug_id,
            modified_ts: self.modified_ts,
            modified_by: self.modified_by,
        };
        let attach_id = (!self.attach_id.is_empty()).then_some(self.attach_id);

        let kind = match tag {
            SourceTag::BugField => RowKind::BugField {
                field: self.field_name,
                value: self.field_value,
            },
            SourceTag::BugSetMember => RowKind::BugSetMember {
                field: self.field_name,
                value: self.field_value,
            },
            SourceTag::AttachmentField => RowKind::AttachmentField {
                attach_id: attach_id.unwrap_or_default(),
                field: self.field_name,
                value: self.field_value,
            },
            SourceTag::Flag => RowKind::Flag {
                attach_id,
                value: self.field_value,
            },
            SourceTag::Activity => RowKind::Activity {
                field: self.field_name,
                new_value: self.field_value,
                old_value: self.field_value_removed,
                attach_id,
            },
        };
        Some((meta, kind))
    }
}

/// JSON scalar accepted where a text column is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => String::new(),
        Some(Loose::Text(s)) => s,
        Some(Loose::Int(n)) => n.to_string(),
        Some(Loose::Float(n)) => n.to_string(),
        Some(Loose::Bool(b)) => b.to_string(),
    })
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Int(n) => Ok(n),
        Loose::Text(s) => parse_timestamp(&s).map_err(serde::de::Error::custom),
        Loose::Float(_) | Loose::Bool(_) => Err(serde::de::Error::custom(
            "modified_ts must be integer milliseconds or a date-time string",
        )),
    }
}

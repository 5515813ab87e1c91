use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::flag::Flag;
use super::measurements::Measurements;
use super::{BugId, Timestamp};

/// Value of one bug or attachment field.
///
/// Serialized untagged: scalars as JSON strings, sets as JSON arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Set(Vec<String>),
}

impl FieldValue {
    /// The scalar string, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Set(_) => None,
        }
    }

    /// The collection, if this is a set.
    #[must_use]
    pub fn as_set(&self) -> Option<&[String]> {
        match self {
            Self::Set(values) => Some(values),
            Self::Scalar(_) => None,
        }
    }
}

/// Field name → value, kept sorted so snapshot documents are stable.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Anything that owns a field map and a flag list: a bug or an attachment.
///
/// Backward and forward replay operate on this seam so one diff routine
/// serves both levels.
pub trait FieldHost {
    fn fields(&self) -> &FieldMap;
    fn fields_mut(&mut self) -> &mut FieldMap;
    fn flags_mut(&mut self) -> &mut Vec<Flag>;

    /// Scalar value of `field`, if present and scalar.
    fn scalar(&self, field: &str) -> Option<&str> {
        self.fields().get(field).and_then(FieldValue::as_scalar)
    }

    /// Members of `field`, if present and set-valued.
    fn set(&self, field: &str) -> Option<&[String]> {
        self.fields().get(field).and_then(FieldValue::as_set)
    }
}

/// A file attached to a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// `"{attach_id}.{created_ts}"`.
    #[serde(rename = "_id")]
    pub id: String,
    pub attach_id: String,
    /// Timestamp of the first row seen for the attachment.
    pub created_ts: Timestamp,
    pub created_by: String,
    #[serde(flatten)]
    pub fields: FieldMap,
    #[serde(default)]
    pub flags: Vec<Flag>,
}

impl Attachment {
    #[must_use]
    pub fn new(attach_id: &str, created_ts: Timestamp, created_by: &str) -> Self {
        Self {
            id: format!("{attach_id}.{created_ts}"),
            attach_id: attach_id.to_string(),
            created_ts,
            created_by: created_by.to_string(),
            fields: FieldMap::new(),
            flags: Vec::new(),
        }
    }
}

impl FieldHost for Attachment {
    fn fields(&self) -> &FieldMap {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    fn flags_mut(&mut self) -> &mut Vec<Flag> {
        &mut self.flags
    }
}

/// One bug at one point in time.
///
/// During assembly this is the head state; after backward replay it is the
/// creation-time state; every emitted snapshot is a clone of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub bug_id: BugId,
    /// `"{bug_id}.{modified_ts}"`.
    #[serde(rename = "_id")]
    pub id: String,
    pub modified_ts: Timestamp,
    pub modified_by: String,
    /// Start of the next version; `None` for the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<Timestamp>,
    #[serde(flatten)]
    pub fields: FieldMap,
    #[serde(default)]
    pub flags: Vec<Flag>,
    /// Attachments visible at `modified_ts`, in creation order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Status-history figures; absent when measuring is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}

impl Record {
    #[must_use]
    pub fn new(bug_id: BugId, modified_ts: Timestamp, modified_by: &str) -> Self {
        Self {
            bug_id,
            id: snapshot_id(bug_id, modified_ts),
            modified_ts,
            modified_by: modified_by.to_string(),
            expires_on: None,
            fields: FieldMap::new(),
            flags: Vec::new(),
            attachments: Vec::new(),
            measurements: None,
        }
    }

    /// Move the record to a new version boundary and refresh its `_id`.
    pub fn stamp(&mut self, modified_ts: Timestamp, modified_by: &str) {
        self.modified_ts = modified_ts;
        modified_by.clone_into(&mut self.modified_by);
        self.id = snapshot_id(self.bug_id, modified_ts);
    }
}

impl FieldHost for Record {
    fn fields(&self) -> &FieldMap {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    fn flags_mut(&mut self) -> &mut Vec<Flag> {
        &mut self.flags
    }
}

/// Snapshot identifier `"{bug_id}.{modified_ts}"`.
#[must_use]
pub fn snapshot_id(bug_id: BugId, modified_ts: Timestamp) -> String {
    format!("{bug_id}.{modified_ts}")
}

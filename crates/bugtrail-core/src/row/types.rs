//! Source-priority tags carried on every input row.
//!
//! The extraction merges five source tables into one stream and stamps each
//! row with a `_merge_order` code naming the table it came from. Within one
//! bug the codes also give the resolution priority of the rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw `_merge_order` code. Wide enough that codes from tables added to
/// the extraction later still parse and can be skipped.
pub type MergeOrder = u32;

/// The five row sources understood by the reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceTag {
    /// Current scalar column of the bugs table.
    BugField,
    /// Current member of a multi-valued bug field (cc, keywords, ...).
    BugSetMember,
    /// Current column of an attachment.
    AttachmentField,
    /// Currently set flag, on the bug or on an attachment.
    Flag,
    /// One historical diff from an activity table.
    Activity,
}

/// Error returned when parsing an unknown tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSourceTag {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownSourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown source tag '{}': expected one of 1, 2, 7, 8, 9 or bug_field, \
             bug_set_member, attachment_field, flag, activity",
            self.raw
        )
    }
}

impl std::error::Error for UnknownSourceTag {}

impl SourceTag {
    /// All known tags in priority order.
    pub const ALL: [Self; 5] = [
        Self::BugField,
        Self::BugSetMember,
        Self::AttachmentField,
        Self::Flag,
        Self::Activity,
    ];

    /// The `_merge_order` wire code assigned by the extraction.
    #[must_use]
    pub const fn code(self) -> MergeOrder {
        match self {
            Self::BugField => 1,
            Self::BugSetMember => 2,
            Self::AttachmentField => 7,
            Self::Flag => 8,
            Self::Activity => 9,
        }
    }

    /// Resolve a wire code. Codes for source tables this build does not
    /// know about return `None`.
    #[must_use]
    pub const fn from_code(code: MergeOrder) -> Option<Self> {
        match code {
            1 => Some(Self::BugField),
            2 => Some(Self::BugSetMember),
            7 => Some(Self::AttachmentField),
            8 => Some(Self::Flag),
            9 => Some(Self::Activity),
            _ => None,
        }
    }

    /// Snake-case name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BugField => "bug_field",
            Self::BugSetMember => "bug_set_member",
            Self::AttachmentField => "attachment_field",
            Self::Flag => "flag",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = UnknownSourceTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownSourceTag { raw: s.to_string() };
        if let Ok(code) = s.trim().parse::<MergeOrder>() {
            return Self::from_code(code).ok_or_else(unknown);
        }
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s.trim())
            .ok_or_else(unknown)
    }
}

impl Serialize for SourceTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

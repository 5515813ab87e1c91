//! Flags set on a bug or on one of its attachments.
//!
//! Bugzilla writes a flag as one string: the flag type name, a status
//! character, and an optional requestee in parentheses, e.g.
//! `review?(alice@example.com)`. The raw representation is what the
//! activity log records and what removal matches against; the parsed parts
//! are carried alongside for consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Timestamp;

/// The status character of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagStatus {
    /// `+`
    #[serde(rename = "+")]
    Granted,
    /// `-`
    #[serde(rename = "-")]
    Denied,
    /// `?`
    #[serde(rename = "?")]
    Requested,
}

impl FlagStatus {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Granted),
            '-' => Some(Self::Denied),
            '?' => Some(Self::Requested),
            _ => None,
        }
    }

    /// The status character as written in a flag representation.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Granted => '+',
            Self::Denied => '-',
            Self::Requested => '?',
        }
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One flag on a bug or attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// When the flag was set. `None` when the setting predates the
    /// activity log (the flag was only ever seen being removed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_ts: Option<Timestamp>,
    /// Who set the flag, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
    /// Raw representation, e.g. `review+`.
    pub value: String,
    /// Flag type name, e.g. `review`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FlagStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requestee: Option<String>,
}

impl Flag {
    /// A flag set at a known time by a known actor.
    #[must_use]
    pub fn set(representation: &str, modified_ts: Timestamp, modified_by: &str) -> Self {
        let mut flag = Self::parse(representation);
        flag.modified_ts = Some(modified_ts);
        flag.modified_by = Some(modified_by.to_string());
        flag
    }

    /// A flag whose setting is older than any row we have for it.
    #[must_use]
    pub fn inherited(representation: &str) -> Self {
        Self::parse(representation)
    }

    /// Does this flag match a representation taken from the activity log?
    #[must_use]
    pub fn matches(&self, representation: &str) -> bool {
        self.value == representation
    }

    fn parse(representation: &str) -> Self {
        let representation = representation.trim();
        let (head, requestee) = match representation.find('(') {
            Some(open) => {
                let inner = &representation[open + 1..];
                let inner = inner.strip_suffix(')').unwrap_or(inner);
                let requestee = (!inner.is_empty()).then(|| inner.to_string());
                (&representation[..open], requestee)
            }
            None => (representation, None),
        };

        let head = head.trim_end();
        let status = head.chars().last().and_then(FlagStatus::from_char);
        let name = if status.is_some() {
            &head[..head.len() - 1]
        } else {
            head
        };

        Self {
            modified_ts: None,
            modified_by: None,
            value: representation.to_string(),
            name: name.to_string(),
            status,
            requestee,
        }
    }
}

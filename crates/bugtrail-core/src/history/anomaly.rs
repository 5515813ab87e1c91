//! Data-integrity anomalies found while reconstructing one bug.
//!
//! None of these abort a run. Each one is logged at `warn` with structured
//! fields, kept on the bug's reconstruction, and counted in the pipeline
//! statistics.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::model::BugId;
use crate::row::MergeOrder;

/// Which stage noticed a membership miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Backward,
    Forward,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Backward => "backward",
            Self::Forward => "forward",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MissingAnchor,
    SetMembership,
    UnknownAttachment,
    TypeMismatch,
}

impl AnomalyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAnchor => "missing_anchor",
            Self::SetMembership => "set_membership",
            Self::UnknownAttachment => "unknown_attachment",
            Self::TypeMismatch => "type_mismatch",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The first row of a bug was not a current bugs-table row.
    #[error("bug {bug_id}: current bugs table record not found (first row has _merge_order {merge_order})")]
    MissingAnchor { bug_id: BugId, merge_order: MergeOrder },

    /// A value or flag to delete was not in the collection.
    #[error("bug {bug_id}: unable to find {field}:{value} in {target} during {pass} replay")]
    SetMembership {
        bug_id: BugId,
        field: String,
        value: String,
        /// `"bug"` or `"attachment <id>"`.
        target: String,
        pass: Pass,
    },

    /// A row or diff addressed an attachment id never seen in current rows.
    #[error("bug {bug_id}: unable to find attachment '{attach_id}'")]
    UnknownAttachment { bug_id: BugId, attach_id: String },

    /// An append targeted a field that is not a collection, or a row named
    /// a key the snapshot document reserves.
    #[error("bug {bug_id}: unable to store '{value}' in field {field}")]
    TypeMismatch {
        bug_id: BugId,
        field: String,
        value: String,
    },
}

impl Anomaly {
    #[must_use]
    pub const fn kind(&self) -> AnomalyKind {
        match self {
            Self::MissingAnchor { .. } => AnomalyKind::MissingAnchor,
            Self::SetMembership { .. } => AnomalyKind::SetMembership,
            Self::UnknownAttachment { .. } => AnomalyKind::UnknownAttachment,
            Self::TypeMismatch { .. } => AnomalyKind::TypeMismatch,
        }
    }

    #[must_use]
    pub const fn bug_id(&self) -> BugId {
        match self {
            Self::MissingAnchor { bug_id, .. }
            | Self::SetMembership { bug_id, .. }
            | Self::UnknownAttachment { bug_id, .. }
            | Self::TypeMismatch { bug_id, .. } => *bug_id,
        }
    }
}

/// Log an anomaly and keep it.
pub(crate) fn report(anomalies: &mut Vec<Anomaly>, anomaly: Anomaly) {
    warn!(
        bug_id = anomaly.bug_id(),
        kind = anomaly.kind().as_str(),
        "{anomaly}"
    );
    anomalies.push(anomaly);
}

/// Human label of a diff target, used in membership anomalies.
pub(crate) fn target_label(attach_id: Option<&str>) -> String {
    attach_id.map_or_else(|| "bug".to_string(), |id| format!("attachment {id}"))
}

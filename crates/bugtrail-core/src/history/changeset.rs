//! Change-sets: every activity diff of one bug sharing one timestamp.

use tracing::trace;

use super::BugContext;
use crate::fields::{membership_view, normalize_field_name};
use crate::model::Timestamp;

/// Where a change event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// A diff row from the activity log.
    Activity,
    /// An attachment's current row. Opens a version boundary at the
    /// attachment's creation time and carries no diff.
    Attachment,
}

/// One field diff inside a change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Canonical field name (the flag alias is already mapped to `flags`).
    pub field: String,
    pub new_value: String,
    pub old_value: String,
    /// `None` when the diff applies to the bug itself.
    pub attach_id: Option<String>,
    pub source: ChangeSource,
}

impl ChangeEvent {
    /// Values present after the change.
    #[must_use]
    pub fn added(&self) -> Vec<&str> {
        membership_view(&self.field, &self.new_value)
    }

    /// Values present before the change.
    #[must_use]
    pub fn removed(&self) -> Vec<&str> {
        membership_view(&self.field, &self.old_value)
    }

    #[must_use]
    pub fn is_activity(&self) -> bool {
        self.source == ChangeSource::Activity
    }
}

/// All events of one bug sharing a timestamp, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub modified_ts: Timestamp,
    /// Actor of the first event seen at this timestamp.
    pub modified_by: String,
    pub changes: Vec<ChangeEvent>,
}

impl ChangeSet {
    #[must_use]
    pub fn new(modified_ts: Timestamp, modified_by: &str) -> Self {
        Self {
            modified_ts,
            modified_by: modified_by.to_string(),
            changes: Vec::new(),
        }
    }

    /// Activity diffs only; attachment markers are skipped.
    pub fn activity(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.changes.iter().filter(|event| event.is_activity())
    }
}

impl BugContext {
    /// The change-set at `ts`, created with `actor` if absent.
    pub(crate) fn changeset_at(&mut self, ts: Timestamp, actor: &str) -> &mut ChangeSet {
        self.changesets
            .entry(ts)
            .or_insert_with(|| ChangeSet::new(ts, actor))
    }

    /// File one activity row into its change-set.
    pub(crate) fn record_activity(
        &mut self,
        ts: Timestamp,
        actor: &str,
        field: &str,
        new_value: String,
        old_value: String,
        attach_id: Option<String>,
    ) {
        let field = normalize_field_name(field, &self.options.flag_field_alias).to_string();
        trace!(bug_id = self.bug_id, ts, field = %field, "recording activity");
        self.changeset_at(ts, actor).changes.push(ChangeEvent {
            field,
            new_value,
            old_value,
            attach_id,
            source: ChangeSource::Activity,
        });
    }
}

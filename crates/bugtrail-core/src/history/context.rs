use std::collections::{BTreeMap, HashMap};

use super::anomaly::{self, Anomaly};
use super::changeset::ChangeSet;
use crate::config::ReplayOptions;
use crate::model::{Attachment, BugId, FieldValue, Record, Timestamp};
use crate::row::{RowKind, RowMeta};

/// Field set from the first row's actor when the bug is opened.
pub const REPORTER_FIELD: &str = "reported_by";

/// Everything known about one bug while its rows stream in.
///
/// Created on the bug's first row, fed by [`BugContext::apply`], and
/// consumed by [`BugContext::reconstruct`].
#[derive(Debug, Clone)]
pub struct BugContext {
    pub(crate) bug_id: BugId,
    pub(crate) created_ts: Timestamp,
    pub(crate) created_by: String,
    pub(crate) head: Record,
    /// In first-seen order.
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) attachment_index: HashMap<String, usize>,
    pub(crate) changesets: BTreeMap<Timestamp, ChangeSet>,
    pub(crate) anomalies: Vec<Anomaly>,
    pub(crate) options: ReplayOptions,
    rows: usize,
}

/// Output of one bug's reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub bug_id: BugId,
    /// In timestamp order; the first is the creation-time state.
    pub snapshots: Vec<Record>,
    pub anomalies: Vec<Anomaly>,
}

impl BugContext {
    /// Open a bug on its first row. The row's timestamp and actor become
    /// the creation time and reporter.
    #[must_use]
    pub fn new(first: &RowMeta, options: ReplayOptions) -> Self {
        let mut head = Record::new(first.bug_id, first.modified_ts, &first.modified_by);
        head.fields.insert(
            REPORTER_FIELD.to_string(),
            FieldValue::Scalar(first.modified_by.clone()),
        );
        Self {
            bug_id: first.bug_id,
            created_ts: first.modified_ts,
            created_by: first.modified_by.clone(),
            head,
            attachments: Vec::new(),
            attachment_index: HashMap::new(),
            changesets: BTreeMap::new(),
            anomalies: Vec::new(),
            options,
            rows: 0,
        }
    }

    #[must_use]
    pub const fn bug_id(&self) -> BugId {
        self.bug_id
    }

    /// The assembled head state (attachments are held separately).
    #[must_use]
    pub const fn head(&self) -> &Record {
        &self.head
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn changesets(&self) -> impl DoubleEndedIterator<Item = &ChangeSet> {
        self.changesets.values()
    }

    #[must_use]
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Rows applied so far.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Route one classified row to its handler.
    pub fn apply(&mut self, meta: &RowMeta, kind: RowKind) {
        self.rows += 1;
        let ts = meta.modified_ts;
        let actor = meta.modified_by.as_str();
        match kind {
            RowKind::BugField { field, value } => self.set_scalar(field, value),
            RowKind::BugSetMember { field, value } => self.append_set_value(field, value),
            RowKind::AttachmentField {
                attach_id,
                field,
                value,
            } => self.upsert_attachment(ts, actor, &attach_id, field, value),
            RowKind::Flag { attach_id, value } => {
                self.upsert_flag_from_current(ts, actor, attach_id.as_deref(), &value);
            }
            RowKind::Activity {
                field,
                new_value,
                old_value,
                attach_id,
            } => self.record_activity(ts, actor, &field, new_value, old_value, attach_id),
        }
    }

    /// Log and keep an anomaly for this bug.
    pub(crate) fn report(&mut self, anomaly: Anomaly) {
        anomaly::report(&mut self.anomalies, anomaly);
    }

    pub(crate) fn attachment_mut(&mut self, attach_id: &str) -> Option<&mut Attachment> {
        let &idx = self.attachment_index.get(attach_id)?;
        self.attachments.get_mut(idx)
    }

    /// Rewind to the creation-time state, then rebuild every version.
    #[must_use]
    pub fn reconstruct(mut self) -> Reconstruction {
        self.rewind();
        self.rebuild()
    }
}

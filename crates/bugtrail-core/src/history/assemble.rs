//! Head-state assembly from current rows (tags 1, 2, 7 and 8).

use std::collections::btree_map::Entry;
use tracing::debug;

use super::BugContext;
use super::anomaly::Anomaly;
use super::changeset::{ChangeEvent, ChangeSource};
use crate::fields::{
    ATTACHMENT_CREATED_BY, ATTACHMENT_CREATED_TS, is_attachment_reserved, is_reserved,
};
use crate::model::{Attachment, FieldValue, Flag, Timestamp};
use crate::row::parse_timestamp;

impl BugContext {
    /// Current value of a scalar bug column. Last write wins.
    pub(crate) fn set_scalar(&mut self, field: String, value: String) {
        if is_reserved(&field) {
            self.report(Anomaly::TypeMismatch {
                bug_id: self.bug_id,
                field,
                value,
            });
            return;
        }
        self.head.fields.insert(field, FieldValue::Scalar(value));
    }

    /// One current member of a multi-valued bug field.
    pub(crate) fn append_set_value(&mut self, field: String, value: String) {
        if is_reserved(&field) {
            self.report(Anomaly::TypeMismatch {
                bug_id: self.bug_id,
                field,
                value,
            });
            return;
        }
        let rejected = match self.head.fields.entry(field) {
            Entry::Vacant(slot) => {
                slot.insert(FieldValue::Set(vec![value]));
                None
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                FieldValue::Set(values) => {
                    values.push(value);
                    None
                }
                FieldValue::Scalar(_) => Some((slot.key().clone(), value)),
            },
        };
        if let Some((field, value)) = rejected {
            self.report(Anomaly::TypeMismatch {
                bug_id: self.bug_id,
                field,
                value,
            });
        }
    }

    /// Current value of one attachment column.
    ///
    /// The first row seen for an attachment fixes its creation time and
    /// creator, and opens a version boundary at that time. `created_ts` and
    /// `created_by` columns replace those values instead of becoming fields.
    pub(crate) fn upsert_attachment(
        &mut self,
        ts: Timestamp,
        actor: &str,
        attach_id: &str,
        field: String,
        value: String,
    ) {
        if attach_id.is_empty() {
            self.report(Anomaly::UnknownAttachment {
                bug_id: self.bug_id,
                attach_id: String::new(),
            });
            return;
        }
        if is_attachment_reserved(&field) {
            self.report(Anomaly::TypeMismatch {
                bug_id: self.bug_id,
                field,
                value,
            });
            return;
        }
        let created_ts = if field == ATTACHMENT_CREATED_TS {
            if let Ok(created_ts) = parse_timestamp(&value) {
                Some(created_ts)
            } else {
                self.report(Anomaly::TypeMismatch {
                    bug_id: self.bug_id,
                    field,
                    value,
                });
                return;
            }
        } else {
            None
        };

        if !self.attachment_index.contains_key(attach_id) {
            debug!(bug_id = self.bug_id, attach_id, created_ts = ts, "new attachment");
            self.attachment_index
                .insert(attach_id.to_string(), self.attachments.len());
            self.attachments.push(Attachment::new(attach_id, ts, actor));
        }

        self.changeset_at(ts, actor).changes.push(ChangeEvent {
            field: field.clone(),
            new_value: value.clone(),
            old_value: String::new(),
            attach_id: Some(attach_id.to_string()),
            source: ChangeSource::Attachment,
        });

        let Some(attachment) = self.attachment_mut(attach_id) else {
            return;
        };
        if let Some(created_ts) = created_ts {
            attachment.created_ts = created_ts;
        } else if field == ATTACHMENT_CREATED_BY {
            attachment.created_by = value;
        } else {
            attachment.fields.insert(field, FieldValue::Scalar(value));
        }
    }

    /// A flag currently set on the bug or on one of its attachments.
    pub(crate) fn upsert_flag_from_current(
        &mut self,
        ts: Timestamp,
        actor: &str,
        attach_id: Option<&str>,
        value: &str,
    ) {
        let flag = Flag::set(value, ts, actor);
        let Some(attach_id) = attach_id else {
            self.head.flags.push(flag);
            return;
        };
        if let Some(attachment) = self.attachment_mut(attach_id) {
            attachment.flags.push(flag);
        } else {
            self.report(Anomaly::UnknownAttachment {
                bug_id: self.bug_id,
                attach_id: attach_id.to_string(),
            });
        }
    }
}

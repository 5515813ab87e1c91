//! Backward replay: undo every change-set, newest first, to reach the
//! creation-time state.

use tracing::debug;

use super::BugContext;
use super::anomaly::{Anomaly, Pass, target_label};
use super::changeset::ChangeEvent;
use super::delta::{Direction, apply_change};

impl BugContext {
    /// Rewind the head state (bug and attachments) in place.
    ///
    /// Change-sets are visited in descending timestamp order; events inside
    /// one change-set are undone in input order.
    pub(crate) fn rewind(&mut self) {
        let changesets = std::mem::take(&mut self.changesets);
        for changeset in changesets.values().rev() {
            debug!(
                bug_id = self.bug_id,
                ts = changeset.modified_ts,
                changes = changeset.changes.len(),
                "rewinding change-set"
            );
            for event in changeset.activity() {
                self.unapply(event);
            }
        }
        self.changesets = changesets;
    }

    fn unapply(&mut self, event: &ChangeEvent) {
        let trim = self.options.trim_uncertain_dependencies;
        let missing = match event.attach_id.as_deref() {
            None => apply_change(&mut self.head, event, Direction::Backward, None, trim),
            Some(attach_id) => {
                let Some(attachment) = self.attachment_mut(attach_id) else {
                    self.report(Anomaly::UnknownAttachment {
                        bug_id: self.bug_id,
                        attach_id: attach_id.to_string(),
                    });
                    return;
                };
                apply_change(attachment, event, Direction::Backward, None, trim)
            }
        };

        let target = target_label(event.attach_id.as_deref());
        for value in missing {
            self.report(Anomaly::SetMembership {
                bug_id: self.bug_id,
                field: event.field.clone(),
                value,
                target: target.clone(),
                pass: Pass::Backward,
            });
        }
    }
}

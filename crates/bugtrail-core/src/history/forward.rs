//! Forward rebuild: walk the version boundaries oldest first and emit one
//! snapshot per boundary.

use std::collections::VecDeque;
use tracing::debug;

use super::anomaly::{self, Anomaly, Pass, target_label};
use super::changeset::{ChangeEvent, ChangeSet};
use super::context::{BugContext, Reconstruction};
use super::delta::{Direction, Stamp, apply_change};
use super::measure::measure;
use super::stabilize::stabilize;
use crate::config::ReplayOptions;
use crate::model::{Attachment, Record};

impl BugContext {
    /// Turn the rewound state into the ordered snapshot list.
    ///
    /// Must run after [`BugContext::rewind`].
    pub(crate) fn rebuild(self) -> Reconstruction {
        let Self {
            bug_id,
            created_ts,
            created_by,
            head,
            attachments,
            changesets,
            mut anomalies,
            options,
            ..
        } = self;

        // The creation boundary absorbs change-sets at or before it.
        let mut boundaries = vec![ChangeSet::new(created_ts, &created_by)];
        for (ts, changeset) in changesets {
            if ts <= created_ts {
                debug!(bug_id, ts, created_ts, "folding change-set into creation");
                boundaries[0].changes.extend(changeset.changes);
            } else {
                boundaries.push(changeset);
            }
        }

        let mut pending: Vec<Attachment> = attachments;
        pending.sort_by(|a, b| {
            a.created_ts
                .cmp(&b.created_ts)
                .then_with(|| a.attach_id.cmp(&b.attach_id))
        });
        let mut pending: VecDeque<Attachment> = pending.into();

        let mut record = head;
        record.attachments.clear();

        let mut snapshots = Vec::with_capacity(boundaries.len());
        for (idx, boundary) in boundaries.iter().enumerate() {
            record.expires_on = boundaries.get(idx + 1).map(|next| next.modified_ts);
            record.stamp(boundary.modified_ts, &boundary.modified_by);

            while pending
                .front()
                .is_some_and(|a| a.created_ts <= boundary.modified_ts)
            {
                record.attachments.extend(pending.pop_front());
            }

            let stamp = Stamp {
                ts: boundary.modified_ts,
                actor: &boundary.modified_by,
            };
            for event in boundary.activity() {
                let missing = replay(&mut record, &mut pending, event, stamp, &options);
                let target = target_label(event.attach_id.as_deref());
                for value in missing {
                    anomaly::report(
                        &mut anomalies,
                        Anomaly::SetMembership {
                            bug_id,
                            field: event.field.clone(),
                            value,
                            target: target.clone(),
                            pass: Pass::Forward,
                        },
                    );
                }
            }

            let mut snapshot = record.clone();
            if options.stabilize {
                stabilize(&mut snapshot);
            }
            debug!(bug_id, id = %snapshot.id, expires_on = ?snapshot.expires_on, "snapshot");
            snapshots.push(snapshot);
        }

        if options.measure {
            measure(&mut snapshots);
        }

        Reconstruction {
            bug_id,
            snapshots,
            anomalies,
        }
    }
}

/// Apply one diff going forward. Attachment diffs are routed to the
/// visible attachment first, then to one not yet visible.
fn replay(
    record: &mut Record,
    pending: &mut VecDeque<Attachment>,
    event: &ChangeEvent,
    stamp: Stamp<'_>,
    options: &ReplayOptions,
) -> Vec<String> {
    let trim = options.trim_uncertain_dependencies;
    let Some(attach_id) = event.attach_id.as_deref() else {
        return apply_change(record, event, Direction::Forward, Some(stamp), trim);
    };
    let target = record
        .attachments
        .iter_mut()
        .chain(pending.iter_mut())
        .find(|a| a.attach_id == attach_id);
    match target {
        Some(attachment) => apply_change(attachment, event, Direction::Forward, Some(stamp), trim),
        None => {
            // Already reported during the backward pass.
            debug!(bug_id = record.bug_id, attach_id, "skipping diff for unknown attachment");
            Vec::new()
        }
    }
}

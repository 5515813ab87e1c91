//! Status-history measurements over a bug's finished snapshot list.

use crate::model::{FieldHost, Measurements, Record};

/// Field carrying the bug's workflow status.
pub const STATUS_FIELD: &str = "bug_status";

/// Status whose arrivals are counted as reopenings.
pub const REOPENED_STATUS: &str = "REOPENED";

const DAY_MS: i64 = 86_400_000;

/// Attach [`Measurements`] to every snapshot, oldest first.
///
/// Time in a status accumulates across consecutive snapshots sharing it and
/// resets when the status changes. The current snapshot has no expiry and
/// contributes no time.
pub fn measure(snapshots: &mut [Record]) {
    let mut previous_status: Option<String> = None;
    let mut ms_in_status: i64 = 0;
    let mut times_reopened: u32 = 0;
    let mut number: u64 = 0;

    for snapshot in snapshots.iter_mut() {
        number += 1;
        let status = snapshot.scalar(STATUS_FIELD).map(str::to_string);

        let mut days_in_previous_status = -1;
        if number > 1 && status != previous_status {
            days_in_previous_status = ms_in_status / DAY_MS;
            ms_in_status = 0;
            if status.as_deref() == Some(REOPENED_STATUS) {
                times_reopened += 1;
            }
        }

        let days_in_status = match snapshot.expires_on {
            Some(expires_on) => {
                ms_in_status += expires_on - snapshot.modified_ts;
                ms_in_status / DAY_MS
            }
            None => -1,
        };

        snapshot.measurements = Some(Measurements {
            number,
            previous_status: previous_status.take(),
            days_in_status,
            days_in_previous_status,
            times_reopened,
        });
        previous_status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, Timestamp};

    fn version(ts: Timestamp, expires_on: Option<Timestamp>, status: &str) -> Record {
        let mut record = Record::new(1, ts, "a");
        record.expires_on = expires_on;
        record
            .fields
            .insert(STATUS_FIELD.into(), FieldValue::Scalar(status.into()));
        record
    }

    fn measured(snapshot: &Record) -> &Measurements {
        snapshot.measurements.as_ref().expect("measured")
    }

    #[test]
    fn single_current_snapshot() {
        let mut snapshots = vec![version(0, None, "NEW")];
        measure(&mut snapshots);
        let only = measured(&snapshots[0]);
        assert_eq!(only.number, 1);
        assert_eq!(only.previous_status, None);
        assert_eq!(only.days_in_status, -1);
        assert_eq!(only.days_in_previous_status, -1);
        assert_eq!(only.times_reopened, 0);
    }

    #[test]
    fn time_accumulates_until_status_changes() {
        let mut snapshots = vec![
            version(0, Some(2 * DAY_MS), "NEW"),
            version(2 * DAY_MS, Some(5 * DAY_MS), "NEW"),
            version(5 * DAY_MS, Some(6 * DAY_MS + 1), "ASSIGNED"),
            version(6 * DAY_MS + 1, None, "RESOLVED"),
        ];
        measure(&mut snapshots);

        let second = measured(&snapshots[1]);
        assert_eq!(second.number, 2);
        assert_eq!(second.previous_status.as_deref(), Some("NEW"));
        assert_eq!(second.days_in_status, 5);
        assert_eq!(second.days_in_previous_status, -1);

        let third = measured(&snapshots[2]);
        assert_eq!(third.previous_status.as_deref(), Some("NEW"));
        assert_eq!(third.days_in_previous_status, 5);
        assert_eq!(third.days_in_status, 1);

        let last = measured(&snapshots[3]);
        assert_eq!(last.number, 4);
        assert_eq!(last.previous_status.as_deref(), Some("ASSIGNED"));
        assert_eq!(last.days_in_previous_status, 1);
        assert_eq!(last.days_in_status, -1);
    }

    #[test]
    fn reopenings_are_counted() {
        let mut snapshots = vec![
            version(0, Some(DAY_MS), "NEW"),
            version(DAY_MS, Some(2 * DAY_MS), "RESOLVED"),
            version(2 * DAY_MS, Some(3 * DAY_MS), "REOPENED"),
            version(3 * DAY_MS, Some(4 * DAY_MS), "REOPENED"),
            version(4 * DAY_MS, Some(5 * DAY_MS), "RESOLVED"),
            version(5 * DAY_MS, None, "REOPENED"),
        ];
        measure(&mut snapshots);
        let counts: Vec<u32> = snapshots
            .iter()
            .map(|s| measured(s).times_reopened)
            .collect();
        assert_eq!(counts, vec![0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn missing_status_is_its_own_state() {
        let mut snapshots = vec![
            Record::new(1, 0, "a"),
            version(DAY_MS, None, "NEW"),
        ];
        snapshots[0].expires_on = Some(DAY_MS);
        measure(&mut snapshots);
        let last = measured(&snapshots[1]);
        assert_eq!(last.previous_status, None);
        assert_eq!(last.days_in_previous_status, 1);
    }
}

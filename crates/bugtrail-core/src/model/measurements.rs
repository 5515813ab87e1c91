use serde::{Deserialize, Serialize};

/// Values derived from a bug's status history, attached to each snapshot.
///
/// Day counts are whole days; `-1` marks a count that does not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    /// 1-based position of the snapshot in its bug's history.
    pub number: u64,
    /// Status of the preceding snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    /// Days spent in the current status up to this snapshot's expiry; `-1`
    /// for the current snapshot.
    pub days_in_status: i64,
    /// Days spent in the status left at this snapshot; `-1` when the status
    /// did not change here.
    pub days_in_previous_status: i64,
    /// Transitions into `REOPENED` up to and including this snapshot.
    pub times_reopened: u32,
}

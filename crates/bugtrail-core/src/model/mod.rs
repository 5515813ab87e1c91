//! Bug, attachment, and flag data model.

pub mod flag;
pub mod measurements;
pub mod record;

pub use flag::{Flag, FlagStatus};
pub use measurements::Measurements;
pub use record::{Attachment, FieldHost, FieldMap, FieldValue, Record, snapshot_id};

/// Bugzilla bug id.
pub type BugId = u64;

/// Milliseconds since the Unix epoch, UTC.
pub type Timestamp = i64;

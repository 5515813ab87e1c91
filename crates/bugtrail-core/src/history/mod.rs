//! Per-bug history reconstruction.
//!
//! A [`BugContext`] lives for the rows of one bug:
//!
//! 1. **Assembly**: current rows build the head state and the attachment
//!    list; activity rows are grouped into change-sets by timestamp.
//! 2. **Backward replay**: change-sets are undone newest first, leaving
//!    the creation-time state.
//! 3. **Forward rebuild**: change-sets are re-applied oldest first and a
//!    snapshot is cut at every boundary, each one expiring where the next
//!    begins.
//! 4. **Measurement**: with the list complete, each snapshot is annotated
//!    with figures derived from its status history.

mod anomaly;
mod assemble;
mod backward;
pub mod changeset;
mod context;
mod delta;
mod forward;
pub mod measure;
pub mod stabilize;

pub use anomaly::{Anomaly, AnomalyKind, Pass};
pub use changeset::{ChangeEvent, ChangeSet, ChangeSource};
pub use context::{BugContext, REPORTER_FIELD, Reconstruction};
pub use measure::measure;
pub use stabilize::stabilize;

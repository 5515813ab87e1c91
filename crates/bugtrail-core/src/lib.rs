//! bugtrail-core library.
//!
//! Rebuilds the version history of a bug from its current field values and
//! its field-level activity log. Rows for one bug are assembled into a head
//! state, rewound to the creation-time state, and replayed forward into one
//! immutable snapshot per change-set.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for I/O-facing return types; data
//!   anomalies are typed ([`history::Anomaly`]) and never abort a run.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod fields;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod row;
pub mod snapshot;

pub use history::{Anomaly, AnomalyKind, BugContext};
pub use model::{Attachment, BugId, FieldValue, Flag, Record, Timestamp};
pub use pipeline::{HistoryPipeline, ReplayStats, run};
pub use row::{Row, RowKind, SourceTag};
pub use snapshot::{SnapshotRow, SnapshotSink};

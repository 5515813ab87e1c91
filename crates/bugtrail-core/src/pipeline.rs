//! Streaming driver.
//!
//! Rows arrive grouped by bug id. The pipeline owns one [`BugContext`] at a
//! time and reconstructs it as soon as the next bug's first row, a sentinel
//! row, or the end of the stream shows that no more rows for it will come.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::ReplayOptions;
use crate::history::{Anomaly, AnomalyKind, BugContext, Reconstruction};
use crate::model::BugId;
use crate::row::{Row, RowMeta, SourceTag};
use crate::snapshot::{SnapshotRow, SnapshotSink};

// ---------------------------------------------------------------------------
// ReplayStats
// ---------------------------------------------------------------------------

/// Anomaly totals by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    pub missing_anchor: usize,
    pub set_membership: usize,
    pub unknown_attachment: usize,
    pub type_mismatch: usize,
}

impl AnomalyCounts {
    pub const fn record(&mut self, kind: AnomalyKind) {
        match kind {
            AnomalyKind::MissingAnchor => self.missing_anchor += 1,
            AnomalyKind::SetMembership => self.set_membership += 1,
            AnomalyKind::UnknownAttachment => self.unknown_attachment += 1,
            AnomalyKind::TypeMismatch => self.type_mismatch += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.missing_anchor + self.set_membership + self.unknown_attachment + self.type_mismatch
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Rows read, including ignored ones.
    pub rows: usize,
    /// Rows with an unknown source tag, plus sentinel rows.
    pub ignored_rows: usize,
    /// Classified rows per source tag.
    pub rows_by_tag: BTreeMap<SourceTag, usize>,
    /// Bugs reconstructed.
    pub records: usize,
    /// Bugs whose id was lower than the bug before them.
    pub out_of_order: usize,
    pub snapshots: usize,
    pub anomalies: AnomalyCounts,
}

// ---------------------------------------------------------------------------
// HistoryPipeline
// ---------------------------------------------------------------------------

/// Routes rows to per-bug contexts and flushes finished bugs.
///
/// Call [`push`](Self::push) for every row, then [`finish`](Self::finish)
/// once. Each call returns the reconstruction of the bug it closed, if any.
pub struct HistoryPipeline {
    options: ReplayOptions,
    current: Option<BugContext>,
    last_bug_id: Option<BugId>,
    stats: ReplayStats,
}

impl HistoryPipeline {
    #[must_use]
    pub fn new(options: ReplayOptions) -> Self {
        Self {
            options,
            current: None,
            last_bug_id: None,
            stats: ReplayStats::default(),
        }
    }

    pub fn push(&mut self, row: Row) -> Option<Reconstruction> {
        self.stats.rows += 1;

        if self.options.sentinel().is_some_and(|sentinel| row.bug_id >= sentinel) {
            debug!(bug_id = row.bug_id, "sentinel row");
            self.stats.ignored_rows += 1;
            return self.flush();
        }

        let flushed = if self
            .current
            .as_ref()
            .is_some_and(|ctx| ctx.bug_id() != row.bug_id)
        {
            self.flush()
        } else {
            None
        };

        let bug_id = row.bug_id;
        let merge_order = row.merge_order;
        let Some((meta, kind)) = row.classify() else {
            debug!(bug_id, merge_order, "ignoring row with unknown source tag");
            self.stats.ignored_rows += 1;
            return flushed;
        };
        *self.stats.rows_by_tag.entry(kind.tag()).or_default() += 1;

        let mut ctx = match self.current.take() {
            Some(ctx) => ctx,
            None => self.open(&meta, kind.tag()),
        };
        ctx.apply(&meta, kind);
        self.current = Some(ctx);

        flushed
    }

    /// Close the last open bug.
    pub fn finish(&mut self) -> Option<Reconstruction> {
        self.flush()
    }

    #[must_use]
    pub const fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    #[must_use]
    pub fn into_stats(self) -> ReplayStats {
        self.stats
    }

    fn open(&mut self, meta: &RowMeta, first: SourceTag) -> BugContext {
        if let Some(previous) = self.last_bug_id.filter(|&last| meta.bug_id < last) {
            warn!(
                bug_id = meta.bug_id,
                previous, "bug ids out of order; rows for one bug must be contiguous"
            );
            self.stats.out_of_order += 1;
        }
        self.last_bug_id = Some(meta.bug_id);
        debug!(bug_id = meta.bug_id, "opening bug");

        let mut ctx = BugContext::new(meta, self.options.clone());
        if first != SourceTag::BugField {
            ctx.report(Anomaly::MissingAnchor {
                bug_id: meta.bug_id,
                merge_order: first.code(),
            });
        }
        ctx
    }

    fn flush(&mut self) -> Option<Reconstruction> {
        let ctx = self.current.take()?;
        let rows = ctx.rows();
        let out = ctx.reconstruct();

        self.stats.records += 1;
        self.stats.snapshots += out.snapshots.len();
        for anomaly in &out.anomalies {
            self.stats.anomalies.record(anomaly.kind());
        }
        debug!(
            bug_id = out.bug_id,
            rows,
            snapshots = out.snapshots.len(),
            anomalies = out.anomalies.len(),
            "bug reconstructed"
        );
        Some(out)
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Drive a row source through the pipeline into `sink`.
///
/// # Errors
///
/// Returns the first error yielded by `rows` or by `sink`. Data anomalies
/// are not errors; they are counted in the returned stats.
pub fn run<I, S>(rows: I, sink: &mut S, options: &ReplayOptions) -> Result<ReplayStats>
where
    I: IntoIterator<Item = Result<Row>>,
    S: SnapshotSink + ?Sized,
{
    let mut pipeline = HistoryPipeline::new(options.clone());
    for row in rows {
        if let Some(out) = pipeline.push(row?) {
            emit_all(sink, &out)?;
        }
    }
    if let Some(out) = pipeline.finish() {
        emit_all(sink, &out)?;
    }
    sink.finish()?;

    let stats = pipeline.into_stats();
    info!(
        rows = stats.rows,
        records = stats.records,
        snapshots = stats.snapshots,
        anomalies = stats.anomalies.total(),
        "replay complete"
    );
    Ok(stats)
}

fn emit_all<S: SnapshotSink + ?Sized>(sink: &mut S, out: &Reconstruction) -> Result<()> {
    for snapshot in &out.snapshots {
        let row = SnapshotRow::from_record(snapshot)
            .with_context(|| format!("serialize snapshot {}", snapshot.id))?;
        sink.emit(row)?;
    }
    Ok(())
}

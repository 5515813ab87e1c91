use anyhow::Result;
use bugtrail_core::config::{ConfigSource, EffectiveConfig};
use bugtrail_core::error::ErrorCode;
use bugtrail_core::history::Reconstruction;
use bugtrail_core::row::{InputFormat, RowReader};
use bugtrail_core::{Anomaly, HistoryPipeline, ReplayStats, SourceTag};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `bugtrail check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Merged row dump to read (`-` for stdin).
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Input encoding, overriding `[input] format`.
    #[arg(long, value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    /// Maximum number of anomalies listed in the report.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Exit non-zero on anomalies or out-of-order bug ids.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    input: String,
    config: ConfigSource,
    /// Input lines consumed, comments and blanks included.
    lines: usize,
    #[serde(flatten)]
    stats: ReplayStats,
    /// Bugs with at least one anomaly.
    anomalous_records: usize,
    /// The first `--limit` anomalies, in stream order.
    anomaly_samples: Vec<Anomaly>,
}

impl CheckReport {
    const fn is_clean(&self) -> bool {
        self.stats.anomalies.total() == 0 && self.stats.out_of_order == 0
    }
}

/// Execute `bugtrail check`: reconstruct every bug without writing
/// snapshots and report what the input looks like.
///
/// # Errors
///
/// Returns an error when the input cannot be opened or parsed, or when
/// `--strict` is set and the input is not clean.
pub fn run_check(
    args: &CheckArgs,
    effective: &EffectiveConfig,
    mode: OutputMode,
    quiet: bool,
) -> Result<()> {
    let format = args.input_format.unwrap_or(effective.config.input.format);
    let reader = super::open_input(&args.input)?;

    let mut pipeline = HistoryPipeline::new(effective.config.replay.clone());
    let mut anomalous_records = 0;
    let mut samples: Vec<Anomaly> = Vec::new();
    let mut collect = |out: Reconstruction| {
        if out.anomalies.is_empty() {
            return;
        }
        anomalous_records += 1;
        let room = args.limit.saturating_sub(samples.len());
        samples.extend(out.anomalies.into_iter().take(room));
    };

    let mut rows = RowReader::new(reader, format);
    for row in rows.by_ref() {
        if let Some(out) = pipeline.push(row?) {
            collect(out);
        }
    }
    if let Some(out) = pipeline.finish() {
        collect(out);
    }

    let report = CheckReport {
        input: args.input.display().to_string(),
        config: effective.source.clone(),
        lines: rows.line_no(),
        stats: pipeline.into_stats(),
        anomalous_records,
        anomaly_samples: samples,
    };

    if !quiet {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        render_mode(&mut out, mode, &report, render_text, render_pretty)?;
    }

    if args.strict && !report.is_clean() {
        return Err(anyhow::anyhow!(
            "{} anomalies, {} out-of-order bugs",
            report.stats.anomalies.total(),
            report.stats.out_of_order
        )
        .context(ErrorCode::AnomaliesDetected));
    }
    Ok(())
}

fn tag_count(stats: &ReplayStats, tag: SourceTag) -> usize {
    stats.rows_by_tag.get(&tag).copied().unwrap_or_default()
}

fn render_text(report: &CheckReport, w: &mut dyn Write) -> io::Result<()> {
    let stats = &report.stats;
    write!(w, "lines={} rows={}", report.lines, stats.rows)?;
    for tag in SourceTag::ALL {
        write!(w, " {}={}", tag.as_str(), tag_count(stats, tag))?;
    }
    writeln!(
        w,
        " ignored={} records={} out_of_order={} anomalies={}",
        stats.ignored_rows,
        stats.records,
        stats.out_of_order,
        stats.anomalies.total()
    )?;
    for anomaly in &report.anomaly_samples {
        writeln!(w, "anomaly kind={} {anomaly}", anomaly.kind())?;
    }
    Ok(())
}

fn render_pretty(report: &CheckReport, w: &mut dyn Write) -> io::Result<()> {
    let stats = &report.stats;
    pretty_section(w, "Input")?;
    pretty_kv(w, "file", &report.input)?;
    pretty_kv(w, "lines", report.lines.to_string())?;
    pretty_kv(w, "rows", stats.rows.to_string())?;
    for tag in SourceTag::ALL {
        pretty_kv(
            w,
            &format!("  {} ({})", tag.as_str(), tag.code()),
            tag_count(stats, tag).to_string(),
        )?;
    }
    pretty_kv(w, "ignored", stats.ignored_rows.to_string())?;
    writeln!(w)?;

    pretty_section(w, "Records")?;
    pretty_kv(w, "records", stats.records.to_string())?;
    pretty_kv(w, "snapshots", stats.snapshots.to_string())?;
    pretty_kv(w, "out of order", stats.out_of_order.to_string())?;
    pretty_kv(w, "with anomalies", report.anomalous_records.to_string())?;

    if !report.anomaly_samples.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Anomalies")?;
        for anomaly in &report.anomaly_samples {
            writeln!(w, "[{}] {anomaly}", anomaly.kind())?;
        }
        let hidden = stats
            .anomalies
            .total()
            .saturating_sub(report.anomaly_samples.len());
        if hidden > 0 {
            writeln!(w, "... and {hidden} more")?;
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use bugtrail_core::config::{Config, ReplayOptions, SnapshotFormat};
use bugtrail_core::error::ErrorCode;
use bugtrail_core::row::{InputFormat, RowReader};
use bugtrail_core::snapshot::{JsonlSink, SnapshotRow, SnapshotSink};
use bugtrail_core::{ReplayStats, run};
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `bugtrail replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Merged row dump to read (`-` for stdin).
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Write snapshots to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input encoding, overriding `[input] format`.
    #[arg(long, value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    /// Emit bare snapshot bodies instead of `{bug_id, _id, body}` rows.
    #[arg(long)]
    pub bodies_only: bool,

    /// Pretty-print each snapshot document.
    #[arg(long)]
    pub pretty: bool,

    /// Keep CC lists in stored order.
    #[arg(long)]
    pub no_stabilize: bool,

    /// Leave out status-history measurements.
    #[arg(long)]
    pub no_measure: bool,

    /// Bug id at or above which rows end the stream (0 disables).
    #[arg(long, value_name = "BUG_ID")]
    pub sentinel: Option<u64>,

    /// Exit non-zero if any anomaly was found (after all output is written).
    #[arg(long)]
    pub strict: bool,
}

impl ReplayArgs {
    /// Replay options after applying command-line overrides.
    pub fn options(&self, config: &Config) -> ReplayOptions {
        let mut options = config.replay.clone();
        if self.no_stabilize {
            options.stabilize = false;
        }
        if self.no_measure {
            options.measure = false;
        }
        if let Some(sentinel) = self.sentinel {
            options.sentinel_bug_id = Some(sentinel);
        }
        options
    }

    fn snapshot_format(&self, config: &Config) -> SnapshotFormat {
        if self.bodies_only {
            SnapshotFormat::Bodies
        } else {
            config.output.format
        }
    }
}

/// Tags sink failures so they surface as output errors.
struct OutputSink<S>(S);

impl<S: SnapshotSink> SnapshotSink for OutputSink<S> {
    fn emit(&mut self, row: SnapshotRow) -> Result<()> {
        self.0.emit(row).context(ErrorCode::OutputWriteFailed)
    }

    fn finish(&mut self) -> Result<()> {
        self.0.finish().context(ErrorCode::OutputWriteFailed)
    }
}

#[derive(Debug, Serialize)]
struct ReplaySummary<'a> {
    input: String,
    output: String,
    #[serde(flatten)]
    stats: &'a ReplayStats,
}

/// Execute `bugtrail replay`.
///
/// # Errors
///
/// Returns an error when the input cannot be opened or parsed, the output
/// cannot be written, or `--strict` is set and anomalies were found.
pub fn run_replay(args: &ReplayArgs, config: &Config, mode: OutputMode, quiet: bool) -> Result<()> {
    let options = args.options(config);
    let input_format = args.input_format.unwrap_or(config.input.format);
    let pretty = args.pretty || config.output.pretty;

    let reader = super::open_input(&args.input)?;
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create {}", path.display()))
                .context(ErrorCode::OutputWriteFailed)?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink = OutputSink(JsonlSink::new(writer, args.snapshot_format(config), pretty));

    info!(input = %args.input.display(), format = %input_format, "replaying");
    let stats = run(RowReader::new(reader, input_format), &mut sink, &options)?;
    debug!(written = sink.0.written(), "snapshots written");
    drop(sink);

    if !quiet {
        let summary = ReplaySummary {
            input: args.input.display().to_string(),
            output: args
                .output
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string()),
            stats: &stats,
        };
        // Snapshots own stdout unless they went to a file.
        let mut out: Box<dyn Write> = if args.output.is_some() {
            Box::new(io::stdout().lock())
        } else {
            Box::new(io::stderr().lock())
        };
        render_mode(&mut *out, mode, &summary, render_text, render_pretty)?;
    }

    let anomalies = stats.anomalies.total();
    if args.strict && anomalies > 0 {
        return Err(anyhow::anyhow!(
            "{anomalies} anomalies across {} records",
            stats.records
        )
        .context(ErrorCode::AnomaliesDetected));
    }
    Ok(())
}

fn render_text(summary: &ReplaySummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let stats = summary.stats;
    writeln!(
        w,
        "rows={} records={} snapshots={} ignored={} out_of_order={} anomalies={}",
        stats.rows,
        stats.records,
        stats.snapshots,
        stats.ignored_rows,
        stats.out_of_order,
        stats.anomalies.total()
    )
}

fn render_pretty(summary: &ReplaySummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let stats = summary.stats;
    pretty_section(w, "Replay summary")?;
    pretty_kv(w, "input", &summary.input)?;
    pretty_kv(w, "output", &summary.output)?;
    pretty_kv(w, "rows", stats.rows.to_string())?;
    pretty_kv(w, "ignored rows", stats.ignored_rows.to_string())?;
    pretty_kv(w, "records", stats.records.to_string())?;
    pretty_kv(w, "snapshots", stats.snapshots.to_string())?;
    if stats.out_of_order > 0 {
        pretty_kv(w, "out of order", stats.out_of_order.to_string())?;
    }
    let counts = stats.anomalies;
    pretty_kv(w, "anomalies", counts.total().to_string())?;
    if counts.total() > 0 {
        pretty_kv(w, "  missing anchor", counts.missing_anchor.to_string())?;
        pretty_kv(w, "  set membership", counts.set_membership.to_string())?;
        pretty_kv(w, "  unknown attachment", counts.unknown_attachment.to_string())?;
        pretty_kv(w, "  type mismatch", counts.type_mismatch.to_string())?;
    }
    Ok(())
}

#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context;
use bugtrail_core::config::resolve_config;
use bugtrail_core::error::ErrorCode;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bugtrail: rebuild bug version history from current state and activity logs",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for bugtrail crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format for summaries and reports.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Config file to use instead of ./bugtrail.toml or the user config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress summaries and non-error logs.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Reconstruct",
        about = "Rebuild snapshots from a row dump",
        long_about = "Read merged current-state and activity rows, rebuild every bug's version history, and write one JSON document per snapshot.",
        after_help = "EXAMPLES:\n    # Replay a TSV dump to stdout\n    bugtrail replay dump.tsv\n\n    # Read JSONL from stdin, write bare bodies to a file\n    cat rows.jsonl | bugtrail replay --input-format jsonl --bodies-only -o snapshots.jsonl\n\n    # Fail the run if any anomaly was found\n    bugtrail replay dump.tsv --strict -o out.jsonl"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        next_help_heading = "Reconstruct",
        about = "Validate a row dump without writing snapshots",
        long_about = "Parse and classify every row, reconstruct every bug, and report row counts per source tag, out-of-order bug ids, and anomalies.",
        after_help = "EXAMPLES:\n    # Summarize a dump\n    bugtrail check dump.tsv\n\n    # Machine-readable report with up to 100 anomalies\n    bugtrail check dump.tsv --limit 100 --json"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    bugtrail completions bash > /etc/bash_completion.d/bugtrail\n\n    # Zsh\n    bugtrail completions zsh > ~/.zfunc/_bugtrail"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Default filter when `BUGTRAIL_LOG` is unset.
fn default_directives(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose || env::var("DEBUG").is_ok() {
        "bugtrail=debug,info"
    } else {
        "bugtrail=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("BUGTRAIL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, quiet)));

    let format = env::var("BUGTRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, mode: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir().context("resolve working directory")?;

    match &cli.command {
        Commands::Replay(args) => {
            let effective = resolve_config(&project_root, cli.config.as_deref())
                .context(ErrorCode::ConfigParseError)?;
            debug!(source = ?effective.source, "config resolved");
            cmd::replay::run_replay(args, &effective.config, mode, cli.quiet)
        }
        Commands::Check(args) => {
            let effective = resolve_config(&project_root, cli.config.as_deref())
                .context(ErrorCode::ConfigParseError)?;
            debug!(source = ?effective.source, "config resolved");
            cmd::check::run_check(args, &effective, mode, cli.quiet)
        }
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command, &mut std::io::stdout())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let mode = cli.output_mode();

    match run(&cli, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("command failed: {err:#}");
            if render_error(mode, &CliError::from_anyhow(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};
use std::io::Write;

/// Arguments for `bugtrail completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `command` to `out`, using the
/// command's own name as the binary name.
///
/// # Errors
///
/// Returns an error if the script cannot be flushed.
pub fn run_completions(
    args: &CompletionsArgs,
    command: &mut clap::Command,
    out: &mut dyn Write,
) -> Result<()> {
    let bin_name = command.get_name().to_string();
    generate(args.shell, command, bin_name, out);
    out.flush().context("flush completion script")
}

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `centrum completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

fn render(shell: Shell, command: &mut clap::Command) -> Vec<u8> {
    let mut script = Vec::new();
    generate(shell, command, "centrum", &mut script);
    script
}

/// Write the completion script for `shell` to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written, e.g. a closed pipe.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    let script = render(shell, command);
    let mut out = io::stdout().lock();
    out.write_all(&script)
        .and_then(|()| out.flush())
        .context("Failed to write completion script")
}

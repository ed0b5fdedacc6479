use std::io::{self, Write};

use anyhow::Result;
use centrum_core::Metric;
use clap::Args;
use serde::Serialize;

use crate::output::OutputMode;

/// Arguments for `centrum metrics`.
#[derive(Args, Debug, Default)]
pub struct MetricsArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputMode::Text)]
    pub format: OutputMode,
}

#[derive(Debug, Serialize)]
struct MetricRow {
    name: &'static str,
    description: &'static str,
    /// Values always fall in `[0, 1]`.
    normalized: bool,
}

fn rows() -> Vec<MetricRow> {
    Metric::ALL
        .into_iter()
        .map(|m| MetricRow {
            name: m.name(),
            description: m.describe(),
            normalized: m.is_normalized(),
        })
        .collect()
}

fn write_rows(w: &mut dyn Write, mode: OutputMode) -> Result<()> {
    let rows = rows();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, &rows)?;
            writeln!(w)?;
        }
        OutputMode::Text => {
            for row in rows {
                writeln!(w, "{:<14} {}", row.name, row.description)?;
            }
        }
    }
    Ok(())
}

/// List the supported centrality metrics.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn run_metrics(args: &MetricsArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_rows(&mut out, args.format)
}

#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use centrum_core::config::resolve_config;
use centrum_core::timing;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "centrum: centrality analysis for street networks",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit a stage timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Config file to layer over the user config in place of ./centrum.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Compute a centrality metric and emit GeoJSON",
        long_about = "Build a street graph from an uploaded archive, an OpenStreetMap place or a saved road network, compute one centrality metric and print it as a GeoJSON FeatureCollection inside a status envelope.",
        after_help = "EXAMPLES:\n    # Edge betweenness of a zipped shapefile\n    centrum analyze --metric betweenness --archive roads.zip\n\n    # Node closeness of an OpenStreetMap place\n    centrum analyze --metric closeness --location \"Moratuwa, Sri Lanka\"\n\n    # Write pretty output to a file\n    centrum analyze -m connectivity --road-network net.json -o out.json --pretty"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        about = "List supported centrality metrics",
        after_help = "EXAMPLES:\n    centrum metrics\n    centrum metrics --format json"
    )]
    Metrics(cmd::metrics::MetricsArgs),

    #[command(about = "Generate shell completion scripts")]
    Completions(cmd::completions::CompletionsArgs),
}

/// Logs go to stderr; stdout carries only the response.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CENTRUM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "centrum=debug,info"
        } else {
            "centrum=info,warn"
        })
    });

    let format = env::var("CENTRUM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, cli.config.as_deref())?;
    debug!(?config, "resolved config");

    let exit = match cli.command {
        Commands::Analyze(ref args) => timing::timed("cmd.analyze", || {
            cmd::analyze::run_analyze(args, config)
        })?,
        Commands::Metrics(ref args) => {
            timing::timed("cmd.metrics", || cmd::metrics::run_metrics(args))?;
            ExitCode::SUCCESS
        }
        Commands::Completions(ref args) => {
            timing::timed("cmd.completions", || {
                let mut command = Cli::command();
                cmd::completions::run_completions(args.shell, &mut command)
            })?;
            ExitCode::SUCCESS
        }
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report.to_json())?);
        }
    }

    Ok(exit)
}
